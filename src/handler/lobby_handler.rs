//! 로비 핸들러
//!
//! IN_LOBBY / WAITING_MATCH 상태 세션의 패킷을 처리합니다.
//! 매칭 대기 등록, 취소, 세션 확인, 신고를 지원하며 큐가
//! 정원에 도달하면 게임방 생성을 시작합니다.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::game::card::MAX_PLAYERS;
use crate::protocol::{packet, Record};
use crate::service::matching_service::AdmitOutcome;
use crate::service::{AccountService, MatchingService, RoomService, SessionService};
use crate::session::{Session, SessionState};

use super::report::handle_report;

/// 로비 핸들러
pub struct LobbyHandler {
    accounts: Arc<AccountService>,
    sessions: Arc<SessionService>,
    matching: Arc<MatchingService>,
    rooms: Arc<RoomService>,
}

impl LobbyHandler {
    /// 새로운 로비 핸들러 생성
    pub fn new(
        accounts: Arc<AccountService>,
        sessions: Arc<SessionService>,
        matching: Arc<MatchingService>,
        rooms: Arc<RoomService>,
    ) -> Self {
        Self {
            accounts,
            sessions,
            matching,
            rooms,
        }
    }

    /// 로비 패킷 처리
    pub async fn handle(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        match record.kind() {
            packet::CMD if record.field(0) == Some(packet::QUERY_WAIT) => {
                self.handle_query_wait(session, record).await
            }
            packet::MATCHING_CANCEL => self.handle_cancel(session, record).await,
            packet::SESSION_READY => self.handle_session_ready(session, record).await,
            packet::TOKEN => self.handle_token(session, record).await,
            packet::REPORT => handle_report(&self.accounts, session, record).await,
            other => {
                warn!("알 수 없는 로비 패킷: {} (세션 {})", other, session.id());
                let reply = Record::with_fields(packet::LOBBY_ERROR, &[packet::UNKNOWN_PACKET]);
                session.send(&reply).await?;
                Ok(())
            }
        }
    }

    /// CMD|QUERY_WAIT|token - 매칭 대기 등록
    ///
    /// 자기 토큰이어야 큐에 들어갑니다. 정원이 차면 6명에게
    /// QUEUE_FULL 을 보낸 뒤 게임방 생성을 별도 태스크로 띄우고,
    /// 아니면 대기자 전원에게 현재 인원을 알립니다.
    async fn handle_query_wait(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        let token = record.field(1).unwrap_or_default();
        let own_token = session.token().await;

        if token.is_empty() || token != own_token {
            session.send(&Record::new(packet::INVALID_TOKEN)).await?;
            return Ok(());
        }

        let outcome = match self.matching.admit(session.id()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("매칭 큐 등록 실패: {}", e);
                session.send(&Record::new(packet::QUEUE_ERROR)).await?;
                return Ok(());
            }
        };

        session.set_state(SessionState::WaitingMatch).await;

        match outcome {
            AdmitOutcome::RoomReady(picked) => {
                let players = self.resolve_sessions(&picked).await;

                // 방 구성 직전, 선발된 6명에게 먼저 알림
                let full_msg = Record::new(packet::QUEUE_FULL);
                for player in &players {
                    if let Err(e) = player.send(&full_msg).await {
                        warn!("QUEUE_FULL 전송 실패 (세션 {}): {}", player.id(), e);
                    }
                }

                info!("매칭 완료, 게임방 생성 시작 ({}명)", players.len());

                let rooms = self.rooms.clone();
                tokio::spawn(async move {
                    if let Err(e) = rooms.create_room(players).await {
                        error!("게임방 생성 실패: {}", e);
                    }
                });
            }
            AdmitOutcome::Waiting(waiting) | AdmitOutcome::AlreadyWaiting(waiting) => {
                let reply = Record::with_fields(
                    packet::WAIT_REPLY,
                    &[waiting.len().to_string(), MAX_PLAYERS.to_string()],
                );

                for waiter in self.resolve_sessions(&waiting).await {
                    if let Err(e) = waiter.send(&reply).await {
                        warn!("WAIT_REPLY 전송 실패 (세션 {}): {}", waiter.id(), e);
                    }
                }
            }
        }

        Ok(())
    }

    /// MATCHING_CANCEL|token - 매칭 취소
    ///
    /// 큐에 없던 세션의 취소도 CANCEL_OK 로 응답합니다 (멱등).
    async fn handle_cancel(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        let token = record.field(0).unwrap_or_default();
        let own_token = session.token().await;

        if !token.is_empty() && token == own_token {
            self.matching.cancel(session.id()).await;
            session.set_state(SessionState::InLobby).await;
        }

        session.send(&Record::new(packet::CANCEL_OK)).await?;
        Ok(())
    }

    /// SESSION_READY|token - 세션 확인
    async fn handle_session_ready(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        let token = record.field(0).unwrap_or_default();
        let own_token = session.token().await;

        let reply = if !token.is_empty() && token == own_token {
            Record::new(packet::SESSION_ACK)
        } else {
            Record::new(packet::SESSION_NOT_FOUND)
        };

        session.send(&reply).await?;
        Ok(())
    }

    /// TOKEN|token - 로비에서의 토큰 재검증
    async fn handle_token(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        let token = record.field(0).unwrap_or_default();
        let own_token = session.token().await;

        let reply = if !token.is_empty() && token == own_token {
            Record::with_fields(packet::TOKEN_VALID, &[session.nickname().await])
        } else {
            Record::new(packet::INVALID_TOKEN)
        };

        session.send(&reply).await?;
        Ok(())
    }

    /// 세션 ID 목록을 살아있는 세션으로 변환
    async fn resolve_sessions(&self, ids: &[u64]) -> Vec<Arc<Session>> {
        let mut resolved = Vec::with_capacity(ids.len());

        for id in ids {
            match self.sessions.find(*id).await {
                Some(session) if !session.is_closed() => resolved.push(session),
                _ => warn!("대기열의 세션을 찾을 수 없음: {}", id),
            }
        }

        resolved
    }
}
