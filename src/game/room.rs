//! 게임방 (게임 매니저)
//!
//! 한 매치의 전체 수명을 관리합니다. 좌석 배정, 카드 배치,
//! 턴/페이즈 상태 기계, 점수 계산, 종료 판정을 담당하며
//! 모든 상태 전이와 방 브로드캐스트는 방 내부 락 안에서
//! 직렬화됩니다. 전적 저장은 락을 벗어난 뒤 호출자가
//! `MatchOutcome` 으로 수행합니다.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::protocol::{packet, Record};
use crate::session::{Session, SessionState};
use crate::tool::error::{ServerError, ServerResult};
use crate::tool::simple_utils::SimpleUtils;

use super::card::{
    role_for_slot, shuffled_card_types, team_for_slot, Card, CardType, GamePhase, PlayerRole, Team,
    BLUE_CARDS, MAX_PLAYERS, RED_CARDS,
};
use super::words::load_word_list;

/// 매치 결과 (전적 저장용)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Win,
    Loss,
}

impl MatchResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchResult::Win => "WIN",
            MatchResult::Loss => "LOSS",
        }
    }
}

/// 게임 종료 결과
///
/// 방 락이 풀린 뒤 호출자가 전적 저장과 방 제거에 사용합니다.
#[derive(Debug)]
pub struct MatchOutcome {
    /// 승자 코드: 0=RED, 1=BLUE, -1=없음(강제 종료)
    pub winner_code: i32,
    /// (닉네임, 결과) 목록. 강제 종료 시 비어 있음.
    pub results: Vec<(String, MatchResult)>,
}

/// 방 내부 상태
struct RoomState {
    seats: [Option<Arc<Session>>; MAX_PLAYERS],
    cards: Vec<Card>,
    turn: Team,
    phase: GamePhase,
    red_score: u32,
    blue_score: u32,
    hint_word: String,
    hint_count: u32,
    remaining_tries: u32,
    game_over: bool,
}

/// 게임방
pub struct GameRoom {
    room_id: String,
    state: Mutex<RoomState>,
}

impl GameRoom {
    /// 빈 게임방 생성
    pub fn new(room_id: String) -> Self {
        debug!("게임방 생성: {}", room_id);

        Self {
            room_id,
            state: Mutex::new(RoomState {
                seats: std::array::from_fn(|_| None),
                cards: Vec::new(),
                turn: Team::Red,
                phase: GamePhase::Hint,
                red_score: 0,
                blue_score: 0,
                hint_word: String::new(),
                hint_count: 0,
                remaining_tries: 0,
                game_over: false,
            }),
        }
    }

    /// 방 ID
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// 플레이어를 빈 슬롯에 추가
    ///
    /// 입장 순서로 슬롯이 정해집니다. 팀/역할은 슬롯 위치로 고정됩니다.
    pub async fn add_player(&self, session: Arc<Session>) -> ServerResult<usize> {
        let mut state = self.state.lock().await;

        for (slot, seat) in state.seats.iter_mut().enumerate() {
            if seat.is_none() {
                let nickname = session.nickname().await;
                info!(
                    "[{}] 플레이어 추가: {} (슬롯 {}, 팀: {}, 역할: {:?})",
                    self.room_id,
                    nickname,
                    slot,
                    team_for_slot(slot).name(),
                    role_for_slot(slot)
                );

                *seat = Some(session);
                return Ok(slot);
            }
        }

        Err(ServerError::game(
            Some(self.room_id.clone()),
            "빈 슬롯이 없습니다",
        ))
    }

    /// 현재 착석 인원 수
    pub async fn player_count(&self) -> usize {
        let state = self.state.lock().await;
        state.seats.iter().filter(|s| s.is_some()).count()
    }

    /// 게임 시작
    ///
    /// 단어 로드, 카드 배치, 상태 초기화 후 시작 패킷 일체를
    /// 모든 플레이어에게 브로드캐스트합니다.
    pub async fn start(&self, word_file: &Path) -> ServerResult<()> {
        let mut state = self.state.lock().await;

        let count = state.seats.iter().filter(|s| s.is_some()).count();
        if count != MAX_PLAYERS {
            return Err(ServerError::game(
                Some(self.room_id.clone()),
                &format!("플레이어가 부족합니다: {}/{}", count, MAX_PLAYERS),
            ));
        }

        // 단어 + 카드 타입 배치
        let words = load_word_list(word_file);
        let types = shuffled_card_types(&mut rand::thread_rng());
        state.cards = words
            .into_iter()
            .zip(types)
            .map(|(word, card_type)| Card {
                word,
                card_type,
                revealed: false,
            })
            .collect();

        state.turn = Team::Red;
        state.phase = GamePhase::Hint;
        state.red_score = 0;
        state.blue_score = 0;
        state.hint_word.clear();
        state.hint_count = 0;
        state.remaining_tries = 0;
        state.game_over = false;

        // 시작 패킷 순서: GAME_START -> GAME_INIT -> 시스템 채팅 -> ALL_CARDS -> TURN_UPDATE
        let start_msg = Record::with_fields(
            packet::GAME_START,
            &[SimpleUtils::current_timestamp().to_string()],
        );
        Self::broadcast(&state.seats, &start_msg).await;

        let init_msg = Self::game_init_record(&state).await;
        Self::broadcast(&state.seats, &init_msg).await;

        Self::broadcast(&state.seats, &Self::system_chat("게임 시작!")).await;

        let cards_msg = Self::all_cards_record(&state);
        Self::broadcast(&state.seats, &cards_msg).await;

        Self::broadcast(&state.seats, &Self::turn_update(&state)).await;

        info!("게임 시작: {}", self.room_id);
        Ok(())
    }

    /// 게임 패킷 처리
    ///
    /// HINT / ANSWER / CHAT 를 검증하고 적용합니다. 규칙 위반은
    /// 상태 변경 없이 무시되고, 데이터 오류(없는 단어)는 보낸
    /// 플레이어에게만 통지됩니다. 게임이 끝나면 `MatchOutcome` 을
    /// 반환하며, 호출자는 락이 풀린 뒤 전적을 저장하고 방을
    /// 제거해야 합니다.
    pub async fn handle_record(
        &self,
        session: &Arc<Session>,
        record: &Record,
    ) -> Option<MatchOutcome> {
        let mut state = self.state.lock().await;

        let slot = match Self::find_slot(&state, session.id()) {
            Some(slot) => slot,
            None => {
                warn!(
                    "[{}] 방에 없는 세션의 게임 패킷: {}",
                    self.room_id,
                    session.id()
                );
                return None;
            }
        };

        match record.kind() {
            packet::HINT => {
                let word = match record.field(0) {
                    Some(w) if !w.is_empty() => w.to_string(),
                    _ => return None,
                };
                let number: u32 = match record.field(1).and_then(|n| n.parse().ok()) {
                    Some(n) => n,
                    None => {
                        debug!("[{}] 힌트 숫자 파싱 실패: {:?}", self.room_id, record.field(1));
                        return None;
                    }
                };

                self.process_hint(&mut state, slot, &word, number).await;
                None
            }
            packet::ANSWER => {
                let word = match record.field(0) {
                    Some(w) if !w.is_empty() => w.to_string(),
                    _ => return None,
                };

                self.process_answer(&mut state, slot, &word).await
            }
            packet::CHAT => {
                let message = record.rest_joined(0);
                self.process_chat(&mut state, slot, &message).await;
                None
            }
            _ => {
                warn!("[{}] 알 수 없는 게임 패킷: {}", self.room_id, record.kind());
                None
            }
        }
    }

    /// 게임 중 이탈 처리
    ///
    /// 좌석을 비우고, 게임이 진행 중이면 승자 없이 강제 종료합니다.
    /// 남은 플레이어가 IN_GAME 에 갇히지 않도록 전원 로비로 되돌립니다.
    pub async fn handle_disconnect(&self, session_id: u64) -> Option<MatchOutcome> {
        let mut state = self.state.lock().await;

        let slot = Self::find_slot(&state, session_id)?;
        let nickname = match &state.seats[slot] {
            Some(session) => session.nickname().await,
            None => String::new(),
        };
        state.seats[slot] = None;

        info!("[{}] 플레이어 이탈: {} (슬롯 {})", self.room_id, nickname, slot);

        if state.game_over {
            return None;
        }

        Some(
            self.force_end(&mut state, &format!("{}님이 게임을 떠나 게임이 종료되었습니다.", nickname))
                .await,
        )
    }

    /// 서버 종료 시 강제 종료
    pub async fn shutdown(&self) -> Option<MatchOutcome> {
        let mut state = self.state.lock().await;

        if state.game_over {
            return None;
        }

        Some(
            self.force_end(&mut state, "예기치 못하게 게임이 종료되었습니다. (서버 종료)")
                .await,
        )
    }

    /// 승자 없는 강제 종료
    async fn force_end(&self, state: &mut RoomState, reason: &str) -> MatchOutcome {
        state.game_over = true;

        Self::broadcast(&state.seats, &Self::system_chat(reason)).await;
        Self::broadcast(
            &state.seats,
            &Record::with_fields(packet::GAME_OVER, &["-1"]),
        )
        .await;

        Self::release_players(state).await;

        info!("[{}] 게임 강제 종료: {}", self.room_id, reason);

        MatchOutcome {
            winner_code: -1,
            results: Vec::new(),
        }
    }

    /// 힌트 처리
    ///
    /// 현재 턴 팀의 팀장만, HINT 페이즈에서만, n >= 1 일 때만 유효합니다.
    async fn process_hint(&self, state: &mut RoomState, slot: usize, word: &str, number: u32) {
        if !Self::is_valid_hint(state, slot, number) {
            debug!("[{}] 힌트 거부: 슬롯 {} ({} {})", self.room_id, slot, word, number);
            return;
        }

        state.hint_word = word.to_string();
        state.hint_count = number;
        state.remaining_tries = number;

        let hint_msg = Record::with_fields(
            packet::HINT,
            &[
                state.turn.code().to_string(),
                word.to_string(),
                number.to_string(),
            ],
        );
        Self::broadcast(&state.seats, &hint_msg).await;

        // 추측 페이즈로 전환
        state.phase = GamePhase::Guess;
        Self::broadcast(&state.seats, &Self::turn_update(state)).await;

        info!(
            "[{}] 힌트: {} ({}) - {}팀",
            self.room_id,
            word,
            number,
            state.turn.name()
        );
    }

    /// 추측 처리
    ///
    /// 현재 턴 팀의 팀원만, GUESS 페이즈에서 남은 시도가 있을 때만
    /// 유효합니다. 카드 결과에 따라 점수/턴/게임 종료를 적용합니다.
    async fn process_answer(
        &self,
        state: &mut RoomState,
        slot: usize,
        word: &str,
    ) -> Option<MatchOutcome> {
        if !Self::is_valid_answer(state, slot) {
            debug!("[{}] 추측 거부: 슬롯 {} ({})", self.room_id, slot, word);
            return None;
        }

        let card_index = state
            .cards
            .iter()
            .position(|c| c.word == word && !c.revealed);

        let card_index = match card_index {
            Some(index) => index,
            None => {
                // 없는 단어 - 해당 플레이어에게만 통지
                if let Some(session) = &state.seats[slot] {
                    let reply = Record::with_fields(
                        packet::ANSWER_RESULT,
                        &[packet::ANSWER_INVALID, word],
                    );
                    if let Err(e) = session.send(&reply).await {
                        warn!("[{}] ANSWER_RESULT 전송 실패: {}", self.room_id, e);
                    }
                }
                return None;
            }
        };

        state.cards[card_index].revealed = true;
        let card_type = state.cards[card_index].card_type;

        let player_name = match &state.seats[slot] {
            Some(session) => session.nickname().await,
            None => String::new(),
        };

        let mut turn_ends = false;
        let mut assassin = false;
        let chat_text;

        match card_type {
            CardType::Red => {
                state.red_score += 1;
                if state.turn == Team::Red {
                    state.remaining_tries -= 1;
                    chat_text = format!("{}님이 RED 카드를 선택! (+1점)", player_name);
                    if state.remaining_tries == 0 {
                        turn_ends = true;
                    }
                } else {
                    turn_ends = true;
                    chat_text = format!("{}님이 RED 카드를 선택! 턴 종료.", player_name);
                }
            }
            CardType::Blue => {
                state.blue_score += 1;
                if state.turn == Team::Blue {
                    state.remaining_tries -= 1;
                    chat_text = format!("{}님이 BLUE 카드를 선택! (+1점)", player_name);
                    if state.remaining_tries == 0 {
                        turn_ends = true;
                    }
                } else {
                    turn_ends = true;
                    chat_text = format!("{}님이 BLUE 카드를 선택! 턴 종료.", player_name);
                }
            }
            CardType::Neutral => {
                // 중립 카드는 점수 변화 없이 턴만 종료
                turn_ends = true;
                chat_text = format!("{}님이 중립 카드를 선택! 턴 종료.", player_name);
            }
            CardType::Assassin => {
                assassin = true;
                chat_text = format!("{}님이 암살자를 선택! 게임 종료.", player_name);
            }
        }

        // remainingTries 반영 후 CARD_UPDATE 전송
        let update_msg = Record::with_fields(
            packet::CARD_UPDATE,
            &[
                card_index.to_string(),
                "1".to_string(),
                state.remaining_tries.to_string(),
            ],
        );
        Self::broadcast(&state.seats, &update_msg).await;
        Self::broadcast(&state.seats, &Self::system_chat(&chat_text)).await;

        info!(
            "[{}] 카드 공개: {} ({:?}), 남은 시도: {}",
            self.room_id, word, card_type, state.remaining_tries
        );

        // 종료 판정: 점수 도달 또는 암살자
        if assassin {
            let winner = state.turn.opponent();
            return Some(self.end_game(state, winner).await);
        }
        if let Some(winner) = Self::check_winner(state) {
            return Some(self.end_game(state, winner).await);
        }

        if turn_ends {
            self.switch_turn(state).await;
        }

        None
    }

    /// 채팅 처리
    ///
    /// 착석한 플레이어의 채팅을 방 전체에 중계합니다.
    async fn process_chat(&self, state: &mut RoomState, slot: usize, message: &str) {
        if state.game_over || message.is_empty() {
            return;
        }

        let player_name = match &state.seats[slot] {
            Some(session) => session.nickname().await,
            None => return,
        };
        let team = team_for_slot(slot);

        let chat_msg = Record::with_fields(
            packet::CHAT,
            &[
                team.code().to_string(),
                slot.to_string(),
                player_name.clone(),
                message.to_string(),
            ],
        );
        Self::broadcast(&state.seats, &chat_msg).await;

        debug!("[{}] 채팅 from {}: {}", self.room_id, player_name, message);
    }

    /// 턴 전환
    ///
    /// 턴을 상대 팀에게 넘기고 힌트 상태를 초기화합니다.
    async fn switch_turn(&self, state: &mut RoomState) {
        state.turn = state.turn.opponent();
        state.phase = GamePhase::Hint;
        state.remaining_tries = 0;
        state.hint_word.clear();
        state.hint_count = 0;

        info!("[{}] 턴 전환: {}팀", self.room_id, state.turn.name());

        Self::broadcast(&state.seats, &Self::turn_update(state)).await;
    }

    /// 점수 기준 승자 판정
    fn check_winner(state: &RoomState) -> Option<Team> {
        if state.red_score >= RED_CARDS as u32 {
            return Some(Team::Red);
        }
        if state.blue_score >= BLUE_CARDS as u32 {
            return Some(Team::Blue);
        }
        None
    }

    /// 게임 종료 처리
    ///
    /// 종료 패킷을 브로드캐스트하고 전 플레이어를 로비로 되돌린 뒤,
    /// 전적 저장에 쓸 결과 목록을 반환합니다.
    async fn end_game(&self, state: &mut RoomState, winner: Team) -> MatchOutcome {
        state.game_over = true;

        Self::broadcast(
            &state.seats,
            &Self::system_chat(&format!("{}팀이 승리했습니다!", winner.name())),
        )
        .await;

        let over_msg = Record::with_fields(packet::GAME_OVER, &[winner.code().to_string()]);
        Self::broadcast(&state.seats, &over_msg).await;

        let mut results = Vec::new();
        for (slot, seat) in state.seats.iter().enumerate() {
            if let Some(session) = seat {
                let result = if team_for_slot(slot) == winner {
                    MatchResult::Win
                } else {
                    MatchResult::Loss
                };
                results.push((session.nickname().await, result));
            }
        }

        Self::release_players(state).await;

        info!("[{}] 게임 종료: {}팀 승리", self.room_id, winner.name());

        MatchOutcome {
            winner_code: winner.code(),
            results,
        }
    }

    /// 전 플레이어를 로비 상태로 되돌리고 좌석을 비움
    async fn release_players(state: &mut RoomState) {
        for seat in state.seats.iter_mut() {
            if let Some(session) = seat.take() {
                session.set_state(SessionState::InLobby).await;
                session.clear_room().await;
            }
        }
    }

    /// 힌트 유효성 검사
    fn is_valid_hint(state: &RoomState, slot: usize, number: u32) -> bool {
        if state.game_over {
            return false;
        }
        if state.seats[slot].is_none() {
            return false;
        }
        if team_for_slot(slot) != state.turn {
            return false;
        }
        if state.phase != GamePhase::Hint {
            return false;
        }
        if role_for_slot(slot) != PlayerRole::Spymaster {
            return false;
        }
        if number < 1 {
            return false;
        }
        true
    }

    /// 추측 유효성 검사
    fn is_valid_answer(state: &RoomState, slot: usize) -> bool {
        if state.game_over {
            return false;
        }
        if state.seats[slot].is_none() {
            return false;
        }
        if role_for_slot(slot) != PlayerRole::Agent {
            return false;
        }
        if team_for_slot(slot) != state.turn {
            return false;
        }
        if state.phase != GamePhase::Guess {
            return false;
        }
        if state.remaining_tries == 0 {
            return false;
        }
        true
    }

    /// 세션 ID 로 슬롯 찾기
    fn find_slot(state: &RoomState, session_id: u64) -> Option<usize> {
        state
            .seats
            .iter()
            .position(|seat| matches!(seat, Some(s) if s.id() == session_id))
    }

    /// 방 전체 브로드캐스트
    ///
    /// 방 락 안에서 호출됩니다. 개별 전송 실패는 경고만 남기고
    /// 나머지 플레이어에게는 계속 전송합니다.
    async fn broadcast(seats: &[Option<Arc<Session>>; MAX_PLAYERS], record: &Record) {
        for seat in seats.iter().flatten() {
            if seat.is_closed() {
                continue;
            }
            if let Err(e) = seat.send(record).await {
                warn!("브로드캐스트 실패 (세션 {}): {}", seat.id(), e);
            }
        }
    }

    /// 시스템 채팅 레코드 생성 (team=2, slot=0, SYSTEM)
    fn system_chat(text: &str) -> Record {
        Record::with_fields(
            packet::CHAT,
            &[
                Team::System.code().to_string(),
                "0".to_string(),
                packet::SYSTEM.to_string(),
                text.to_string(),
            ],
        )
    }

    /// TURN_UPDATE 레코드 생성
    fn turn_update(state: &RoomState) -> Record {
        Record::with_fields(
            packet::TURN_UPDATE,
            &[
                state.turn.code().to_string(),
                state.phase.code().to_string(),
                state.red_score.to_string(),
                state.blue_score.to_string(),
            ],
        )
    }

    /// GAME_INIT 레코드 생성
    ///
    /// 슬롯마다 `닉네임|슬롯|팀|팀장여부` 4필드, 빈 슬롯은 `EMPTY`.
    async fn game_init_record(state: &RoomState) -> Record {
        let mut record = Record::new(packet::GAME_INIT);

        for (slot, seat) in state.seats.iter().enumerate() {
            let nickname = match seat {
                Some(session) => session.nickname().await,
                None => packet::EMPTY.to_string(),
            };
            let is_leader = if role_for_slot(slot) == PlayerRole::Spymaster {
                "1"
            } else {
                "0"
            };

            record.push(nickname);
            record.push(slot.to_string());
            record.push(team_for_slot(slot).code().to_string());
            record.push(is_leader);
        }

        record
    }

    /// ALL_CARDS 레코드 생성
    ///
    /// 카드마다 `단어|타입|공개여부` 3필드, 25장.
    fn all_cards_record(state: &RoomState) -> Record {
        let mut record = Record::new(packet::ALL_CARDS);

        for card in &state.cards {
            record.push(card.word.clone());
            record.push(card.card_type.code().to_string());
            record.push(if card.revealed { "1" } else { "0" });
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::MAX_CARDS;

    /// 6명이 착석해 시작까지 끝난 방과 세션 목록을 만든다.
    /// 단어 파일이 없으므로 보드는 "단어1".."단어25" 로 결정적이다.
    async fn make_started_room() -> (Arc<GameRoom>, Vec<Arc<Session>>) {
        let room = Arc::new(GameRoom::new("room_test".to_string()));
        let mut sessions = Vec::new();

        for i in 0..MAX_PLAYERS {
            let session = Arc::new(Session::detached(i as u64 + 1, &format!("플레이어{}", i)));
            room.add_player(session.clone()).await.unwrap();
            sessions.push(session);
        }

        room.start(Path::new("no_such_words_file.txt")).await.unwrap();
        (room, sessions)
    }

    /// 지정 타입의 미공개 카드 단어를 찾는다.
    async fn word_of_type(room: &GameRoom, card_type: CardType) -> String {
        let state = room.state.lock().await;
        state
            .cards
            .iter()
            .find(|c| c.card_type == card_type && !c.revealed)
            .map(|c| c.word.clone())
            .unwrap()
    }

    async fn hint(room: &GameRoom, session: &Arc<Session>, word: &str, n: u32) {
        let record = Record::with_fields(packet::HINT, &[word.to_string(), n.to_string()]);
        room.handle_record(session, &record).await;
    }

    async fn answer(
        room: &GameRoom,
        session: &Arc<Session>,
        word: &str,
    ) -> Option<MatchOutcome> {
        let record = Record::with_fields(packet::ANSWER, &[word]);
        room.handle_record(session, &record).await
    }

    /// 착석과 시작 상태 테스트
    #[tokio::test]
    async fn test_start_initializes_board() {
        let (room, _sessions) = make_started_room().await;
        let state = room.state.lock().await;

        assert_eq!(state.cards.len(), MAX_CARDS);
        assert_eq!(state.turn, Team::Red);
        assert_eq!(state.phase, GamePhase::Hint);
        assert_eq!(state.red_score, 0);
        assert_eq!(state.blue_score, 0);
        assert_eq!(state.remaining_tries, 0);
        assert!(!state.game_over);
        assert_eq!(
            state.cards.iter().filter(|c| c.card_type == CardType::Red).count(),
            RED_CARDS
        );
    }

    /// 6명 미만이면 시작 불가
    #[tokio::test]
    async fn test_start_requires_full_room() {
        let room = GameRoom::new("room_partial".to_string());
        for i in 0..3 {
            let session = Arc::new(Session::detached(i + 1, "p"));
            room.add_player(session).await.unwrap();
        }

        assert!(room.start(Path::new("no_such_words_file.txt")).await.is_err());
    }

    /// 팀장이 아닌 플레이어의 힌트는 무시
    #[tokio::test]
    async fn test_hint_rejects_non_leader() {
        let (room, sessions) = make_started_room().await;

        hint(&room, &sessions[1], "강", 2).await;

        let state = room.state.lock().await;
        assert_eq!(state.phase, GamePhase::Hint);
        assert_eq!(state.remaining_tries, 0);
    }

    /// 상대 팀장의 힌트는 무시
    #[tokio::test]
    async fn test_hint_rejects_wrong_team() {
        let (room, sessions) = make_started_room().await;

        hint(&room, &sessions[3], "강", 2).await;

        let state = room.state.lock().await;
        assert_eq!(state.phase, GamePhase::Hint);
    }

    /// 0 이하의 힌트 숫자는 무시
    #[tokio::test]
    async fn test_hint_rejects_zero() {
        let (room, sessions) = make_started_room().await;

        hint(&room, &sessions[0], "강", 0).await;

        let state = room.state.lock().await;
        assert_eq!(state.phase, GamePhase::Hint);
        assert_eq!(state.remaining_tries, 0);
    }

    /// 유효한 힌트는 추측 페이즈로 전환
    #[tokio::test]
    async fn test_valid_hint_switches_phase() {
        let (room, sessions) = make_started_room().await;

        hint(&room, &sessions[0], "강", 3).await;

        let state = room.state.lock().await;
        assert_eq!(state.phase, GamePhase::Guess);
        assert_eq!(state.remaining_tries, 3);
        assert_eq!(state.hint_word, "강");
        assert_eq!(state.hint_count, 3);
    }

    /// 힌트 페이즈의 추측은 무시
    #[tokio::test]
    async fn test_answer_rejected_in_hint_phase() {
        let (room, sessions) = make_started_room().await;
        let red_word = word_of_type(&room, CardType::Red).await;

        let outcome = answer(&room, &sessions[1], &red_word).await;
        assert!(outcome.is_none());

        let state = room.state.lock().await;
        assert_eq!(state.red_score, 0);
        assert!(!state.cards.iter().any(|c| c.revealed));
    }

    /// 팀장의 추측은 무시
    #[tokio::test]
    async fn test_answer_rejected_from_leader() {
        let (room, sessions) = make_started_room().await;
        hint(&room, &sessions[0], "강", 2).await;
        let red_word = word_of_type(&room, CardType::Red).await;

        answer(&room, &sessions[0], &red_word).await;

        let state = room.state.lock().await;
        assert!(!state.cards.iter().any(|c| c.revealed));
    }

    /// 상대 팀원의 추측은 무시
    #[tokio::test]
    async fn test_answer_rejected_from_other_team() {
        let (room, sessions) = make_started_room().await;
        hint(&room, &sessions[0], "강", 2).await;
        let red_word = word_of_type(&room, CardType::Red).await;

        answer(&room, &sessions[4], &red_word).await;

        let state = room.state.lock().await;
        assert!(!state.cards.iter().any(|c| c.revealed));
        assert_eq!(state.remaining_tries, 2);
    }

    /// 없는 단어는 상태를 바꾸지 않음
    #[tokio::test]
    async fn test_answer_unknown_word() {
        let (room, sessions) = make_started_room().await;
        hint(&room, &sessions[0], "강", 2).await;

        let outcome = answer(&room, &sessions[1], "없는단어").await;
        assert!(outcome.is_none());

        let state = room.state.lock().await;
        assert_eq!(state.remaining_tries, 2);
        assert!(!state.cards.iter().any(|c| c.revealed));
    }

    /// 자기 팀 카드: 점수 증가, 시도 차감
    #[tokio::test]
    async fn test_answer_own_color_scores() {
        let (room, sessions) = make_started_room().await;
        hint(&room, &sessions[0], "강", 2).await;
        let red_word = word_of_type(&room, CardType::Red).await;

        let outcome = answer(&room, &sessions[1], &red_word).await;
        assert!(outcome.is_none());

        let state = room.state.lock().await;
        assert_eq!(state.red_score, 1);
        assert_eq!(state.remaining_tries, 1);
        assert_eq!(state.turn, Team::Red);
        assert_eq!(state.phase, GamePhase::Guess);
        assert_eq!(state.cards.iter().filter(|c| c.revealed).count(), 1);
    }

    /// HINT|word|1 이면 정답 한 번으로 턴 종료
    #[tokio::test]
    async fn test_single_try_ends_turn() {
        let (room, sessions) = make_started_room().await;
        hint(&room, &sessions[0], "강", 1).await;
        let red_word = word_of_type(&room, CardType::Red).await;

        answer(&room, &sessions[1], &red_word).await;

        let state = room.state.lock().await;
        assert_eq!(state.red_score, 1);
        assert_eq!(state.turn, Team::Blue);
        assert_eq!(state.phase, GamePhase::Hint);
        assert_eq!(state.remaining_tries, 0);
        assert!(state.hint_word.is_empty());
    }

    /// 중립 카드: 점수 없이 턴 종료
    #[tokio::test]
    async fn test_neutral_ends_turn() {
        let (room, sessions) = make_started_room().await;
        hint(&room, &sessions[0], "강", 3).await;
        let neutral_word = word_of_type(&room, CardType::Neutral).await;

        answer(&room, &sessions[1], &neutral_word).await;

        let state = room.state.lock().await;
        assert_eq!(state.red_score, 0);
        assert_eq!(state.blue_score, 0);
        assert_eq!(state.turn, Team::Blue);
        assert_eq!(state.phase, GamePhase::Hint);
    }

    /// 상대 팀 카드: 상대 점수 증가 + 턴 종료
    #[tokio::test]
    async fn test_opponent_card_scores_them() {
        let (room, sessions) = make_started_room().await;
        hint(&room, &sessions[0], "강", 3).await;
        let blue_word = word_of_type(&room, CardType::Blue).await;

        answer(&room, &sessions[1], &blue_word).await;

        let state = room.state.lock().await;
        assert_eq!(state.blue_score, 1);
        assert_eq!(state.red_score, 0);
        assert_eq!(state.turn, Team::Blue);
        assert_eq!(state.phase, GamePhase::Hint);
    }

    /// 암살자: 즉시 게임 종료, 상대 팀 승리
    #[tokio::test]
    async fn test_assassin_ends_game() {
        let (room, sessions) = make_started_room().await;
        hint(&room, &sessions[0], "강", 3).await;
        let assassin_word = word_of_type(&room, CardType::Assassin).await;

        let outcome = answer(&room, &sessions[1], &assassin_word).await;
        let outcome = outcome.expect("암살자는 게임을 끝내야 함");

        assert_eq!(outcome.winner_code, Team::Blue.code());
        assert_eq!(outcome.results.len(), MAX_PLAYERS);
        assert_eq!(
            outcome
                .results
                .iter()
                .filter(|(_, r)| *r == MatchResult::Win)
                .count(),
            3
        );

        let state = room.state.lock().await;
        assert!(state.game_over);

        // 전 플레이어가 로비로 복귀
        for session in &sessions {
            assert_eq!(session.state().await, SessionState::InLobby);
            assert!(session.room().await.is_none());
        }
    }

    /// RED 9점 도달 시 RED 승리
    #[tokio::test]
    async fn test_red_score_win() {
        let (room, sessions) = make_started_room().await;

        let mut outcome = None;
        // 양 팀이 번갈아 RED 카드만 공개해 RED 점수를 9점까지 올린다
        for _ in 0..RED_CARDS {
            hint(&room, &sessions[0], "강", 1).await;
            let red_word = word_of_type(&room, CardType::Red).await;
            outcome = answer(&room, &sessions[1], &red_word).await;
            if outcome.is_some() {
                break;
            }

            // BLUE 팀원이 RED 카드를 잘못 고르면 RED 점수가 오르고 턴이 넘어온다
            hint(&room, &sessions[3], "바다", 1).await;
            let red_word = word_of_type(&room, CardType::Red).await;
            outcome = answer(&room, &sessions[4], &red_word).await;
            if outcome.is_some() {
                break;
            }
        }

        let outcome = outcome.expect("9점 도달 시 게임이 끝나야 함");
        assert_eq!(outcome.winner_code, Team::Red.code());

        let wins: Vec<_> = outcome
            .results
            .iter()
            .filter(|(_, r)| *r == MatchResult::Win)
            .map(|(nick, _)| nick.clone())
            .collect();
        assert_eq!(wins, vec!["플레이어0", "플레이어1", "플레이어2"]);

        let state = room.state.lock().await;
        assert_eq!(state.red_score, RED_CARDS as u32);
        assert!(state.game_over);
    }

    /// 종료된 게임의 패킷은 모두 무시
    #[tokio::test]
    async fn test_packets_ignored_after_game_over() {
        let (room, sessions) = make_started_room().await;
        hint(&room, &sessions[0], "강", 1).await;
        let assassin_word = word_of_type(&room, CardType::Assassin).await;
        answer(&room, &sessions[1], &assassin_word).await;

        // 종료 후에는 좌석이 비어 있으므로 어떤 패킷도 적용되지 않음
        hint(&room, &sessions[3], "바다", 2).await;

        let state = room.state.lock().await;
        assert!(state.game_over);
        assert_eq!(state.seats.iter().filter(|s| s.is_some()).count(), 0);
    }

    /// 게임 중 이탈은 승자 없는 강제 종료
    #[tokio::test]
    async fn test_disconnect_forces_end() {
        let (room, sessions) = make_started_room().await;

        let outcome = room.handle_disconnect(sessions[2].id()).await;
        let outcome = outcome.expect("진행 중 이탈은 강제 종료");

        assert_eq!(outcome.winner_code, -1);
        assert!(outcome.results.is_empty());

        let state = room.state.lock().await;
        assert!(state.game_over);

        // 남은 플레이어 전원 로비 복귀
        for session in sessions.iter().filter(|s| s.id() != 3) {
            assert_eq!(session.state().await, SessionState::InLobby);
        }
    }

    /// 채팅은 게임 상태를 바꾸지 않음
    #[tokio::test]
    async fn test_chat_does_not_change_state() {
        let (room, sessions) = make_started_room().await;

        let record = Record::parse("CHAT|안녕|하세요").unwrap();
        let outcome = room.handle_record(&sessions[4], &record).await;
        assert!(outcome.is_none());

        let state = room.state.lock().await;
        assert_eq!(state.turn, Team::Red);
        assert_eq!(state.phase, GamePhase::Hint);
        assert!(!state.game_over);
    }
}
