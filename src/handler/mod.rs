//! 핸들러 레이어
//!
//! 세션 상태별 패킷 처리를 담당합니다. 연결 핸들러가 수신
//! 루프를 돌며 인증/로비/게임 핸들러로 분배합니다.

pub mod auth_handler;
pub mod connection_handler;
pub mod game_handler;
pub mod lobby_handler;
pub mod report;

pub use auth_handler::AuthHandler;
pub use connection_handler::ConnectionHandler;
pub use game_handler::GameHandler;
pub use lobby_handler::LobbyHandler;
