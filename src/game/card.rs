//! 게임 기본 타입 정의
//!
//! 팀, 역할, 페이즈, 카드 타입과 와이어 코드 매핑을 정의합니다.

use rand::seq::SliceRandom;
use rand::Rng;

/// 최대 플레이어 수
pub const MAX_PLAYERS: usize = 6;
/// 보드 카드 수
pub const MAX_CARDS: usize = 25;
/// 레드팀 카드 수
pub const RED_CARDS: usize = 9;
/// 블루팀 카드 수
pub const BLUE_CARDS: usize = 8;
/// 중립 카드 수
pub const NEUTRAL_CARDS: usize = 7;
/// 암살자 카드 수
pub const ASSASSIN_CARDS: usize = 1;

/// 팀
///
/// 와이어 코드: 0=RED, 1=BLUE, 2=SYSTEM (시스템 채팅 전용)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    Red,
    Blue,
    System,
}

impl Team {
    /// 와이어 코드
    pub fn code(self) -> i32 {
        match self {
            Team::Red => 0,
            Team::Blue => 1,
            Team::System => 2,
        }
    }

    /// 상대 팀
    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
            Team::System => Team::System,
        }
    }

    /// 표시용 이름
    pub fn name(self) -> &'static str {
        match self {
            Team::Red => "RED",
            Team::Blue => "BLUE",
            Team::System => "SYSTEM",
        }
    }
}

/// 플레이어 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerRole {
    /// 팀원 - 카드를 추측
    Agent,
    /// 팀장 - 힌트를 제시
    Spymaster,
}

/// 턴 내부 페이즈
///
/// 와이어 코드: 0=HINT, 1=GUESS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Hint,
    Guess,
}

impl GamePhase {
    pub fn code(self) -> i32 {
        match self {
            GamePhase::Hint => 0,
            GamePhase::Guess => 1,
        }
    }
}

/// 카드 타입
///
/// 와이어 코드: 1=RED, 2=BLUE, 3=NEUTRAL, 4=ASSASSIN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    Red,
    Blue,
    Neutral,
    Assassin,
}

impl CardType {
    pub fn code(self) -> i32 {
        match self {
            CardType::Red => 1,
            CardType::Blue => 2,
            CardType::Neutral => 3,
            CardType::Assassin => 4,
        }
    }
}

/// 보드 카드 한 장
#[derive(Debug, Clone)]
pub struct Card {
    pub word: String,
    pub card_type: CardType,
    pub revealed: bool,
}

/// 슬롯 인덱스의 팀 배정
///
/// 0..2 는 RED, 3..5 는 BLUE. 입장 순서로 슬롯이 정해지며
/// 게임 중에는 바뀌지 않습니다.
pub fn team_for_slot(slot: usize) -> Team {
    if slot < 3 {
        Team::Red
    } else {
        Team::Blue
    }
}

/// 슬롯 인덱스의 역할 배정
///
/// 슬롯 0 과 3 이 각 팀의 팀장입니다.
pub fn role_for_slot(slot: usize) -> PlayerRole {
    if slot == 0 || slot == 3 {
        PlayerRole::Spymaster
    } else {
        PlayerRole::Agent
    }
}

/// 9/8/7/1 분포의 카드 타입 배치를 무작위로 섞어 반환
pub fn shuffled_card_types<R: Rng>(rng: &mut R) -> Vec<CardType> {
    let mut types = Vec::with_capacity(MAX_CARDS);

    types.extend(std::iter::repeat(CardType::Red).take(RED_CARDS));
    types.extend(std::iter::repeat(CardType::Blue).take(BLUE_CARDS));
    types.extend(std::iter::repeat(CardType::Neutral).take(NEUTRAL_CARDS));
    types.extend(std::iter::repeat(CardType::Assassin).take(ASSASSIN_CARDS));

    types.shuffle(rng);
    types
}
