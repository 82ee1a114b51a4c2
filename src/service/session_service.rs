//! 세션 레지스트리 서비스
//!
//! 살아있는 세션을 세션 ID 와 인증 토큰 양쪽으로 색인합니다.
//! 두 색인은 하나의 락 아래에서만 갱신되어 항상 일관됩니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::protocol::Record;
use crate::session::Session;
use crate::tool::error::{ServerError, ServerResult};

/// 레지스트리 내부 색인
struct Registry {
    by_id: HashMap<u64, Arc<Session>>,
    by_token: HashMap<String, u64>,
}

/// 세션 레지스트리
pub struct SessionService {
    registry: Mutex<Registry>,
    next_session_id: AtomicU64,
    max_sessions: usize,
}

impl SessionService {
    /// 새로운 세션 레지스트리 생성
    pub fn new(max_sessions: usize) -> Self {
        Self {
            registry: Mutex::new(Registry {
                by_id: HashMap::new(),
                by_token: HashMap::new(),
            }),
            next_session_id: AtomicU64::new(1),
            max_sessions,
        }
    }

    /// 새 세션 ID 발급
    pub fn next_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 세션 등록
    ///
    /// 중복 세션 ID 나 수용 한도 초과 시 등록을 거부합니다.
    pub async fn register(&self, session: Arc<Session>) -> ServerResult<()> {
        let mut registry = self.registry.lock().await;

        if registry.by_id.len() >= self.max_sessions {
            return Err(ServerError::transport(
                Some(session.id()),
                Some(session.addr().to_string()),
                &format!("서버가 가득 참: {}/{}", registry.by_id.len(), self.max_sessions),
            ));
        }

        if registry.by_id.contains_key(&session.id()) {
            return Err(ServerError::internal(
                "SessionService",
                &format!("중복 세션 ID: {}", session.id()),
            ));
        }

        let count = registry.by_id.len() + 1;
        registry.by_id.insert(session.id(), session.clone());

        info!("세션 등록: {} ({}) (총 {}개)", session.id(), session.addr(), count);
        Ok(())
    }

    /// 토큰을 세션에 바인딩
    ///
    /// 로그인/회원가입 성공 시 호출됩니다. 이미 다른 세션이 쓰는
    /// 토큰이면 바인딩을 거부합니다. 같은 세션의 이전 토큰은
    /// 해제됩니다.
    pub async fn bind_token(&self, session_id: u64, token: &str) -> ServerResult<()> {
        if token.is_empty() {
            return Err(ServerError::auth("빈 토큰은 바인딩할 수 없습니다"));
        }

        let mut registry = self.registry.lock().await;

        if !registry.by_id.contains_key(&session_id) {
            return Err(ServerError::internal(
                "SessionService",
                &format!("등록되지 않은 세션: {}", session_id),
            ));
        }

        if let Some(owner) = registry.by_token.get(token) {
            if *owner != session_id {
                warn!("토큰 바인딩 거부: 중복 토큰 (세션 {})", session_id);
                return Err(ServerError::auth("이미 사용 중인 토큰"));
            }
            return Ok(());
        }

        // 재로그인 시 이전 토큰 해제
        registry.by_token.retain(|_, sid| *sid != session_id);
        registry.by_token.insert(token.to_string(), session_id);

        debug!("토큰 바인딩: 세션 {}", session_id);
        Ok(())
    }

    /// 세션 제거
    ///
    /// ID 색인과 토큰 색인을 함께 정리합니다. 없는 세션이면 무시합니다.
    pub async fn remove(&self, session_id: u64) {
        let mut registry = self.registry.lock().await;

        if registry.by_id.remove(&session_id).is_some() {
            registry.by_token.retain(|_, sid| *sid != session_id);
            info!("세션 제거: {} (총 {}개)", session_id, registry.by_id.len());
        }
    }

    /// 세션 ID 로 조회
    pub async fn find(&self, session_id: u64) -> Option<Arc<Session>> {
        self.registry.lock().await.by_id.get(&session_id).cloned()
    }

    /// 토큰으로 세션 조회
    pub async fn find_by_token(&self, token: &str) -> Option<Arc<Session>> {
        let registry = self.registry.lock().await;
        let session_id = registry.by_token.get(token)?;
        registry.by_id.get(session_id).cloned()
    }

    /// 현재 세션 수
    pub async fn count(&self) -> usize {
        self.registry.lock().await.by_id.len()
    }

    /// 전체 세션 브로드캐스트
    ///
    /// 락 아래에서 세션 목록을 스냅샷한 뒤, 락을 풀고 전송합니다.
    /// 소켓 I/O 동안 레지스트리 락을 쥐지 않습니다.
    pub async fn broadcast_all(&self, record: &Record) {
        let snapshot: Vec<Arc<Session>> = {
            let registry = self.registry.lock().await;
            registry.by_id.values().cloned().collect()
        };

        for session in &snapshot {
            if session.is_closed() {
                continue;
            }
            if let Err(e) = session.send(record).await {
                warn!("전체 브로드캐스트 실패 (세션 {}): {}", session.id(), e);
            }
        }

        debug!("전체 브로드캐스트 완료: {}개 세션", snapshot.len());
    }

    /// 모든 세션을 비우고 반환 (서버 종료용)
    pub async fn drain_all(&self) -> Vec<Arc<Session>> {
        let mut registry = self.registry.lock().await;
        registry.by_token.clear();
        registry.by_id.drain().map(|(_, session)| session).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 등록/조회/제거 테스트
    #[tokio::test]
    async fn test_register_find_remove() {
        let service = SessionService::new(10);
        let session = Arc::new(Session::detached(service.next_id(), "tester"));
        let session_id = session.id();

        service.register(session.clone()).await.unwrap();
        assert_eq!(service.count().await, 1);
        assert!(service.find(session_id).await.is_some());

        service.remove(session_id).await;
        assert_eq!(service.count().await, 0);
        assert!(service.find(session_id).await.is_none());
    }

    /// 중복 세션 ID 등록 거부 테스트
    #[tokio::test]
    async fn test_register_rejects_duplicate_id() {
        let service = SessionService::new(10);
        let a = Arc::new(Session::detached(1, "a"));
        let b = Arc::new(Session::detached(1, "b"));

        service.register(a).await.unwrap();
        assert!(service.register(b).await.is_err());
    }

    /// 수용 한도 테스트
    #[tokio::test]
    async fn test_register_respects_capacity() {
        let service = SessionService::new(1);
        service
            .register(Arc::new(Session::detached(1, "a")))
            .await
            .unwrap();

        assert!(service
            .register(Arc::new(Session::detached(2, "b")))
            .await
            .is_err());
    }

    /// 토큰 바인딩과 조회 테스트
    #[tokio::test]
    async fn test_token_binding() {
        let service = SessionService::new(10);
        let session = Arc::new(Session::detached(1, "tester"));
        service.register(session.clone()).await.unwrap();

        service.bind_token(1, "tok123").await.unwrap();
        let found = service.find_by_token("tok123").await.unwrap();
        assert_eq!(found.id(), 1);

        assert!(service.find_by_token("없는토큰").await.is_none());
    }

    /// 중복 토큰 바인딩 거부 테스트
    #[tokio::test]
    async fn test_duplicate_token_rejected() {
        let service = SessionService::new(10);
        service.register(Arc::new(Session::detached(1, "a"))).await.unwrap();
        service.register(Arc::new(Session::detached(2, "b"))).await.unwrap();

        service.bind_token(1, "tok").await.unwrap();
        assert!(service.bind_token(2, "tok").await.is_err());
    }

    /// 재로그인 시 이전 토큰 해제 테스트
    #[tokio::test]
    async fn test_rebind_releases_old_token() {
        let service = SessionService::new(10);
        service.register(Arc::new(Session::detached(1, "a"))).await.unwrap();

        service.bind_token(1, "old").await.unwrap();
        service.bind_token(1, "new").await.unwrap();

        assert!(service.find_by_token("old").await.is_none());
        assert!(service.find_by_token("new").await.is_some());
    }

    /// 브로드캐스트는 개별 전송 실패에도 끝까지 진행되어야 함
    #[tokio::test]
    async fn test_broadcast_all_tolerates_send_failures() {
        let service = SessionService::new(10);
        service.register(Arc::new(Session::detached(1, "a"))).await.unwrap();
        service.register(Arc::new(Session::detached(2, "b"))).await.unwrap();

        // 소켓 없는 세션들이라 전송은 실패하지만 패닉 없이 완료된다
        let record = Record::new(crate::protocol::packet::QUEUE_FULL);
        service.broadcast_all(&record).await;

        assert_eq!(service.count().await, 2);
    }

    /// 제거 시 토큰 색인도 함께 정리되어야 함
    #[tokio::test]
    async fn test_remove_clears_token_index() {
        let service = SessionService::new(10);
        service.register(Arc::new(Session::detached(1, "a"))).await.unwrap();
        service.bind_token(1, "tok").await.unwrap();

        service.remove(1).await;
        assert!(service.find_by_token("tok").await.is_none());
    }
}
