//! 게임 핸들러
//!
//! IN_GAME 상태 세션의 패킷을 해당 게임방으로 전달합니다.
//! 게임이 끝나면 방 락이 풀린 뒤 전적을 저장하고 방을 제거합니다.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::protocol::{packet, Record};
use crate::service::{AccountService, RoomService};
use crate::session::Session;

use super::report::handle_report;

/// 게임 핸들러
pub struct GameHandler {
    accounts: Arc<AccountService>,
    rooms: Arc<RoomService>,
}

impl GameHandler {
    /// 새로운 게임 핸들러 생성
    pub fn new(accounts: Arc<AccountService>, rooms: Arc<RoomService>) -> Self {
        Self { accounts, rooms }
    }

    /// 게임 패킷 처리
    pub async fn handle(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        if record.kind() == packet::REPORT {
            return handle_report(&self.accounts, session, record).await;
        }

        let room = match session.room().await {
            Some(room) => room,
            None => {
                // 매칭 직후 아직 방이 연결되지 않았거나 이미 해체된 경우
                warn!("게임방 없는 세션의 게임 패킷: {}", session.id());
                session.send(&Record::new(packet::GAME_NOT_IMPLEMENTED)).await?;
                return Ok(());
            }
        };

        let outcome = room.handle_record(session, record).await;

        if let Some(outcome) = outcome {
            // 방 락이 풀린 뒤에 전적을 기록한다.
            // 저장 실패는 로그만 남기고 게임 종료 흐름을 막지 않는다.
            for (nickname, result) in &outcome.results {
                match self.accounts.save_result(nickname, *result).await {
                    Ok(true) => {}
                    Ok(false) => error!("전적 저장 실패 - 사용자 없음: {}", nickname),
                    Err(e) => error!("전적 저장 실패: {} - {}", nickname, e),
                }
            }

            info!(
                "게임 종료 처리 완료: {} (승자 코드 {})",
                room.room_id(),
                outcome.winner_code
            );
            self.rooms.destroy(room.room_id());
        }

        Ok(())
    }
}
