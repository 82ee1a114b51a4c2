//! 매칭 큐 서비스
//!
//! 매칭을 기다리는 세션을 입장 순서대로 보관합니다. 취소는
//! 큐를 압축하지 않고 멤버십만 지우며(툼스톤), 압축은 다음
//! 드레인 때 지연 처리됩니다. 큐 락이 등록과 드레인을 모두
//! 직렬화하므로 방 생성 경합이 없습니다.

use std::collections::{HashSet, VecDeque};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::game::card::MAX_PLAYERS;
use crate::tool::error::{ServerError, ServerResult};

/// 큐 등록 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// 대기 인원이 방 정원에 도달: 앞에서부터 6명을 꺼내 반환
    RoomReady(Vec<u64>),
    /// 대기 중: 현재 대기자 전체 (새 대기자 포함, 입장 순서)
    Waiting(Vec<u64>),
    /// 이미 큐에 있던 세션: 현재 대기자 전체
    AlreadyWaiting(Vec<u64>),
}

/// 큐 내부 상태
struct QueueInner {
    order: VecDeque<u64>,
    members: HashSet<u64>,
}

impl QueueInner {
    /// 툼스톤을 걷어내고 유효한 대기자만 남긴다 (지연 압축)
    fn compact(&mut self) {
        let members = &self.members;
        self.order.retain(|id| members.contains(id));
    }

    fn waiting(&self) -> Vec<u64> {
        self.order
            .iter()
            .filter(|id| self.members.contains(id))
            .copied()
            .collect()
    }
}

/// 매칭 큐 서비스
pub struct MatchingService {
    inner: Mutex<QueueInner>,
}

impl MatchingService {
    /// 새로운 매칭 큐 생성
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                order: VecDeque::new(),
                members: HashSet::new(),
            }),
        }
    }

    /// 세션을 큐에 등록하고 드레인 여부를 판단합니다.
    ///
    /// 등록과 드레인이 한 락 안에서 처리되어, 정확히 6명이 모인
    /// 순간 그 6명만 방 생성 대상으로 빠져나갑니다.
    pub async fn admit(&self, session_id: u64) -> ServerResult<AdmitOutcome> {
        let mut inner = self.inner.lock().await;

        if inner.members.contains(&session_id) {
            debug!("이미 매칭 큐에 있는 세션: {}", session_id);
            return Ok(AdmitOutcome::AlreadyWaiting(inner.waiting()));
        }

        inner.members.insert(session_id);
        inner.order.push_back(session_id);
        inner.compact();

        let waiting = inner.waiting();
        info!("매칭 큐 등록: 세션 {} (대기 {}명)", session_id, waiting.len());

        if waiting.len() >= MAX_PLAYERS {
            let mut picked = Vec::with_capacity(MAX_PLAYERS);
            while picked.len() < MAX_PLAYERS {
                let id = match inner.order.pop_front() {
                    Some(id) => id,
                    None => break,
                };
                if inner.members.remove(&id) {
                    picked.push(id);
                }
            }

            if picked.len() != MAX_PLAYERS {
                // compact 직후라 일어날 수 없는 상황
                return Err(ServerError::matching(
                    Some(session_id),
                    "드레인 중 대기 인원 불일치",
                ));
            }

            info!("매칭 큐 충족: {:?}", picked);
            return Ok(AdmitOutcome::RoomReady(picked));
        }

        Ok(AdmitOutcome::Waiting(waiting))
    }

    /// 매칭 취소 (툼스톤)
    ///
    /// 큐에서 실제로 제거하지 않고 멤버십만 지웁니다.
    /// 큐에 없던 세션이어도 성공으로 처리합니다.
    pub async fn cancel(&self, session_id: u64) -> bool {
        let mut inner = self.inner.lock().await;
        let was_member = inner.members.remove(&session_id);

        if was_member {
            debug!("매칭 취소: 세션 {}", session_id);
        }
        was_member
    }

    /// 현재 대기자 목록 (입장 순서)
    pub async fn waiting(&self) -> Vec<u64> {
        self.inner.lock().await.waiting()
    }

    /// 큐 멤버십 확인
    pub async fn contains(&self, session_id: u64) -> bool {
        self.inner.lock().await.members.contains(&session_id)
    }
}

impl Default for MatchingService {
    fn default() -> Self {
        Self::new()
    }
}
