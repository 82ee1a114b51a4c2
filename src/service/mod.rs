//! 서비스 레이어
//!
//! 서버 전역 싱글톤들을 정의합니다. 계정 저장소, 세션 레지스트리,
//! 매칭 큐, 게임방 레지스트리가 각각 자기 락 뒤에 있으며,
//! 서버 컨텍스트를 통해 명시적으로 전달됩니다.

pub mod account_service;
pub mod matching_service;
pub mod room_service;
pub mod session_service;

pub use account_service::AccountService;
pub use matching_service::MatchingService;
pub use room_service::RoomService;
pub use session_service::SessionService;
