//! 공통 에러 처리 시스템
//!
//! 서버에서 발생하는 모든 에러를 체계적으로 관리합니다.

use std::error::Error as StdError;
use std::fmt;

/// 서버 에러 타입
///
/// 서버에서 발생할 수 있는 모든 에러를 체계적으로 분류합니다.
#[derive(Debug, Clone)]
pub enum ServerError {
    /// 전송(소켓) 관련 에러
    Transport {
        session_id: Option<u64>,
        addr: Option<String>,
        message: String,
    },

    /// 프로토콜 관련 에러
    Protocol {
        kind: Option<String>,
        message: String,
    },

    /// 인증 관련 에러
    Auth { message: String },

    /// 매칭 큐 관련 에러
    Matching {
        session_id: Option<u64>,
        message: String,
    },

    /// 게임 진행 관련 에러
    Game {
        room_id: Option<String>,
        message: String,
    },

    /// 저장소(DB) 관련 에러
    Storage { operation: String, message: String },

    /// 설정 관련 에러
    Configuration { key: String, message: String },

    /// 내부 시스템 에러
    Internal { component: String, message: String },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Transport {
                session_id,
                addr,
                message,
            } => {
                write!(f, "전송 에러")?;
                if let Some(id) = session_id {
                    write!(f, " [세션 {}]", id)?;
                }
                if let Some(address) = addr {
                    write!(f, " [{}]", address)?;
                }
                write!(f, ": {}", message)
            }
            ServerError::Protocol { kind, message } => {
                write!(f, "프로토콜 에러")?;
                if let Some(k) = kind {
                    write!(f, " [타입: {}]", k)?;
                }
                write!(f, ": {}", message)
            }
            ServerError::Auth { message } => {
                write!(f, "인증 에러: {}", message)
            }
            ServerError::Matching {
                session_id,
                message,
            } => {
                write!(f, "매칭 에러")?;
                if let Some(id) = session_id {
                    write!(f, " [세션 {}]", id)?;
                }
                write!(f, ": {}", message)
            }
            ServerError::Game { room_id, message } => {
                write!(f, "게임 에러")?;
                if let Some(id) = room_id {
                    write!(f, " [방 {}]", id)?;
                }
                write!(f, ": {}", message)
            }
            ServerError::Storage { operation, message } => {
                write!(f, "저장소 에러 [작업: {}]: {}", operation, message)
            }
            ServerError::Configuration { key, message } => {
                write!(f, "설정 에러 [키: {}]: {}", key, message)
            }
            ServerError::Internal { component, message } => {
                write!(f, "내부 에러 [컴포넌트: {}]: {}", component, message)
            }
        }
    }
}

impl StdError for ServerError {}

/// 에러 생성 헬퍼 함수들
impl ServerError {
    /// 전송 에러 생성
    pub fn transport(session_id: Option<u64>, addr: Option<String>, message: &str) -> Self {
        Self::Transport {
            session_id,
            addr,
            message: message.to_string(),
        }
    }

    /// 프로토콜 에러 생성
    pub fn protocol(kind: Option<String>, message: &str) -> Self {
        Self::Protocol {
            kind,
            message: message.to_string(),
        }
    }

    /// 인증 에러 생성
    pub fn auth(message: &str) -> Self {
        Self::Auth {
            message: message.to_string(),
        }
    }

    /// 매칭 에러 생성
    pub fn matching(session_id: Option<u64>, message: &str) -> Self {
        Self::Matching {
            session_id,
            message: message.to_string(),
        }
    }

    /// 게임 에러 생성
    pub fn game(room_id: Option<String>, message: &str) -> Self {
        Self::Game {
            room_id,
            message: message.to_string(),
        }
    }

    /// 저장소 에러 생성
    pub fn storage(operation: &str, message: &str) -> Self {
        Self::Storage {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// 내부 에러 생성
    pub fn internal(component: &str, message: &str) -> Self {
        Self::Internal {
            component: component.to_string(),
            message: message.to_string(),
        }
    }
}

/// 결과 타입 별칭
pub type ServerResult<T> = Result<T, ServerError>;

/// 에러 변환 트레이트 구현
impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport {
            session_id: None,
            addr: None,
            message: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage {
            operation: "query".to_string(),
            message: err.to_string(),
        }
    }
}
