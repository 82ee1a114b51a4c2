//! 간단한 공통 유틸리티

use rand::{distributions::Alphanumeric, Rng};

/// 토큰 길이 (32자 영숫자)
pub const TOKEN_LEN: usize = 32;

/// Salt 길이 (16자 영숫자)
pub const SALT_LEN: usize = 16;

/// 간단한 데이터 유틸리티
pub struct SimpleUtils;

impl SimpleUtils {
    /// 현재 타임스탬프 (초)
    pub fn current_timestamp() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// 지정한 길이의 영숫자 랜덤 문자열 생성
    pub fn random_alnum(len: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    /// 로그인/회원가입 성공 시 발급되는 인증 토큰 생성
    pub fn generate_token() -> String {
        Self::random_alnum(TOKEN_LEN)
    }

    /// 비밀번호 해싱용 Salt 생성
    pub fn generate_salt() -> String {
        Self::random_alnum(SALT_LEN)
    }
}
