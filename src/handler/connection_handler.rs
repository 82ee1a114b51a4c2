//! 연결 핸들러
//!
//! 연결 하나의 전체 수명을 담당합니다. 세션 등록, 개행 단위
//! 수신 루프, 상태별 디스패치, 종료 시 정리를 수행합니다.
//! 디스패치는 세마포어 기반 워커 풀로 동시 실행 수가 제한되며,
//! 세션당 한 번에 한 레코드만 처리됩니다.

use anyhow::Result;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::protocol::Record;
use crate::service::{AccountService, MatchingService, RoomService, SessionService};
use crate::session::{Session, SessionState};

use super::auth_handler::AuthHandler;
use super::game_handler::GameHandler;
use super::lobby_handler::LobbyHandler;

/// 연결 핸들러
pub struct ConnectionHandler {
    sessions: Arc<SessionService>,
    matching: Arc<MatchingService>,
    rooms: Arc<RoomService>,
    workers: Arc<Semaphore>,
    auth_handler: AuthHandler,
    lobby_handler: LobbyHandler,
    game_handler: GameHandler,
}

impl ConnectionHandler {
    /// 새로운 연결 핸들러 생성
    pub fn new(
        accounts: Arc<AccountService>,
        sessions: Arc<SessionService>,
        matching: Arc<MatchingService>,
        rooms: Arc<RoomService>,
        worker_count: usize,
    ) -> Self {
        let auth_handler = AuthHandler::new(accounts.clone(), sessions.clone());
        let lobby_handler = LobbyHandler::new(
            accounts.clone(),
            sessions.clone(),
            matching.clone(),
            rooms.clone(),
        );
        let game_handler = GameHandler::new(accounts, rooms.clone());

        Self {
            sessions,
            matching,
            rooms,
            workers: Arc::new(Semaphore::new(worker_count)),
            auth_handler,
            lobby_handler,
            game_handler,
        }
    }

    /// 새로운 사용자 연결 처리
    ///
    /// 세션을 만들어 레지스트리에 등록한 뒤, 연결이 끊길 때까지
    /// 수신 루프를 돕니다. 루프를 벗어나면 정리 경로로 들어갑니다.
    pub async fn handle_connection(&self, stream: TcpStream, addr: std::net::SocketAddr) -> Result<()> {
        let session_id = self.sessions.next_id();
        let (read_half, write_half) = stream.into_split();
        let session = Arc::new(Session::new(session_id, addr.to_string(), write_half));

        if let Err(e) = self.sessions.register(session.clone()).await {
            warn!("세션 등록 거부: {}", e);
            session.close().await;
            return Ok(());
        }

        info!("새 사용자 연결: {} (세션 {})", addr, session_id);

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();

        loop {
            if session.is_closed() {
                break;
            }

            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    debug!("클라이언트 연결 종료: 세션 {}", session_id);
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim_end_matches(['\r', '\n']);
                    if trimmed.is_empty() {
                        continue;
                    }

                    let record = match Record::parse(trimmed) {
                        Ok(record) => record,
                        Err(e) => {
                            // 타입 없는 레코드는 응답 없이 버린다
                            debug!("레코드 파싱 실패 (세션 {}): {}", session_id, e);
                            continue;
                        }
                    };

                    self.dispatch(&session, &record).await;
                }
                Err(e) => {
                    debug!("수신 오류 (세션 {}): {}", session_id, e);
                    break;
                }
            }
        }

        self.cleanup(&session).await;
        Ok(())
    }

    /// 상태별 패킷 디스패치
    ///
    /// 워커 세마포어 허가를 받은 뒤 현재 세션 상태에 맞는
    /// 핸들러로 넘깁니다. 핸들러 실패는 서버를 멈추지 않고
    /// 로그만 남깁니다.
    async fn dispatch(&self, session: &Arc<Session>, record: &Record) {
        let _permit = match self.workers.acquire().await {
            Ok(permit) => permit,
            Err(_) => return, // 세마포어가 닫힘 - 서버 종료 중
        };

        debug!("수신 (세션 {}): {}", session.id(), record);

        let result = match session.state().await {
            SessionState::Authenticating => self.auth_handler.handle(session, record).await,
            SessionState::WaitingMatch | SessionState::InLobby => {
                self.lobby_handler.handle(session, record).await
            }
            SessionState::InGame => self.game_handler.handle(session, record).await,
        };

        if let Err(e) = result {
            error!("메시지 처리 실패 (세션 {}): {}", session.id(), e);
        }
    }

    /// 연결 정리
    ///
    /// 매칭 큐 탈퇴, 게임방 이탈 통보, 레지스트리 제거 순서로
    /// 정리합니다. 진행 중이던 게임은 강제 종료되어 방이 해체됩니다.
    async fn cleanup(&self, session: &Arc<Session>) {
        session.close().await;

        self.matching.cancel(session.id()).await;

        if let Some(room) = session.room().await {
            if room.handle_disconnect(session.id()).await.is_some() {
                self.rooms.destroy(room.room_id());
            }
        }

        self.sessions.remove(session.id()).await;
        info!("사용자 연결 해제 완료: 세션 {}", session.id());
    }
}
