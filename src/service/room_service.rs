//! 게임방 레지스트리 서비스
//!
//! 살아있는 게임방의 소유권을 가집니다. 방 생성 중 실패하면
//! 삽입을 되돌리고 플레이어 전원을 로비로 복귀시킵니다.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{error, info, warn};

use crate::game::card::MAX_PLAYERS;
use crate::game::room::GameRoom;
use crate::protocol::{packet, Record};
use crate::session::{Session, SessionState};
use crate::tool::error::{ServerError, ServerResult};
use crate::tool::simple_utils::SimpleUtils;

/// 게임방 레지스트리
pub struct RoomService {
    rooms: DashMap<String, Arc<GameRoom>>,
    word_file: PathBuf,
    room_seq: AtomicU64,
}

impl RoomService {
    /// 새로운 게임방 레지스트리 생성
    pub fn new(word_file: PathBuf) -> Self {
        Self {
            rooms: DashMap::new(),
            word_file,
            room_seq: AtomicU64::new(1),
        }
    }

    /// 게임방 생성
    ///
    /// 방을 만들어 레지스트리에 넣고, 6명을 착석시켜 IN_GAME 으로
    /// 전환한 뒤 게임을 시작합니다. 시작 전에 실패하면 삽입을
    /// 되돌리고 전원을 로비로 복귀시키며 GAME_CREATE_ERROR 를
    /// 보냅니다.
    pub async fn create_room(&self, players: Vec<Arc<Session>>) -> ServerResult<Arc<GameRoom>> {
        if players.len() != MAX_PLAYERS {
            return Err(ServerError::matching(
                None,
                &format!("방 생성 인원 불일치: {}", players.len()),
            ));
        }

        let room_id = format!(
            "room_{}_{}",
            SimpleUtils::current_timestamp(),
            self.room_seq.fetch_add(1, Ordering::SeqCst)
        );
        let room = Arc::new(GameRoom::new(room_id.clone()));

        self.rooms.insert(room_id.clone(), room.clone());
        info!("게임방 생성 시작: {}", room_id);

        let result = self.seat_and_start(&room, &players).await;

        if let Err(e) = result {
            error!("게임방 생성 오류: {} - {}", room_id, e);
            self.rooms.remove(&room_id);

            // 플레이어들을 로비로 되돌림
            for session in &players {
                session.set_state(SessionState::InLobby).await;
                session.clear_room().await;

                if !session.is_closed() {
                    let notice = Record::new(packet::GAME_CREATE_ERROR);
                    if let Err(send_err) = session.send(&notice).await {
                        warn!("GAME_CREATE_ERROR 전송 실패: {}", send_err);
                    }
                }
            }

            return Err(e);
        }

        info!("✅ 게임 시작 완료: {}", room_id);
        Ok(room)
    }

    /// 착석과 게임 시작
    async fn seat_and_start(
        &self,
        room: &Arc<GameRoom>,
        players: &[Arc<Session>],
    ) -> ServerResult<()> {
        for session in players {
            if session.is_closed() {
                return Err(ServerError::game(
                    Some(room.room_id().to_string()),
                    &format!("착석 전 세션 종료: {}", session.id()),
                ));
            }

            room.add_player(session.clone()).await?;
            session.set_room(room).await;
            session.set_state(SessionState::InGame).await;
        }

        room.start(&self.word_file).await
    }

    /// 게임방 제거 (멱등)
    pub fn destroy(&self, room_id: &str) {
        if self.rooms.remove(room_id).is_some() {
            info!("게임방 제거: {}", room_id);
        }
    }

    /// 현재 방 수
    pub fn count(&self) -> usize {
        self.rooms.len()
    }

    /// 모든 방 강제 종료 (서버 종료용)
    ///
    /// 진행 중인 방마다 승자 없는 종료를 브로드캐스트하고
    /// 레지스트리를 비웁니다.
    pub async fn shutdown_all(&self) {
        let rooms: Vec<Arc<GameRoom>> = self.rooms.iter().map(|e| e.value().clone()).collect();
        self.rooms.clear();

        if rooms.is_empty() {
            return;
        }

        info!("게임방 {}개 종료 중...", rooms.len());
        for room in rooms {
            room.shutdown().await;
        }
    }
}
