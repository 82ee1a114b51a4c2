//! 서버 환경 설정 모듈
//!
//! .env 파일과 시스템 환경변수에서 설정을 로드하고 관리합니다.

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

/// 서버 설정 구조체
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 서버 호스트 주소
    pub host: String,
    /// 서버 포트 번호
    pub port: u16,
    /// 메시지 디스패치 워커 수
    pub worker_count: usize,
    /// 최대 동시 접속 수
    pub max_connections: usize,
    /// 사용자 DB 파일 경로
    pub db_path: String,
    /// 카드 단어 목록 파일 경로
    pub word_file: String,
}

impl ServerConfig {
    /// 환경변수에서 설정을 로드합니다.
    ///
    /// 로드 순서:
    /// 1. 현재 디렉토리의 .env 파일
    /// 2. 시스템 환경변수
    /// 3. 기본값
    pub fn from_env() -> Result<Self> {
        Self::load_env_file();

        let config = Self {
            host: std::env::var("server_host").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("server_port")
                .unwrap_or_else(|_| "55014".to_string())
                .parse()
                .unwrap_or(55014),
            worker_count: std::env::var("worker_count")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            max_connections: std::env::var("max_connections")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            db_path: std::env::var("db_path").unwrap_or_else(|_| "db/users.db".to_string()),
            word_file: std::env::var("word_file").unwrap_or_else(|_| "words.txt".to_string()),
        };

        info!("서버 설정 로드 완료: {:?}", config);
        Ok(config)
    }

    /// 프로세스 인자로 호스트/포트를 덮어씁니다.
    ///
    /// 사용법: `codenames-server [host port]`
    pub fn apply_args(&mut self, args: &[String]) {
        if let Some(host) = args.first() {
            self.host = host.clone();
        }
        if let Some(port) = args.get(1) {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => warn!("포트 인자 파싱 실패, 기존 값 유지: {}", port),
            }
        }
    }

    /// 서버 바인딩 주소를 반환합니다.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// .env 파일을 로드합니다.
    fn load_env_file() {
        let env_paths = vec![".env", "../.env"];

        let mut loaded = false;
        for path in env_paths {
            if Path::new(path).exists() && dotenv::from_filename(path).is_ok() {
                info!(".env 파일 로드 성공: {}", path);
                loaded = true;
                break;
            }
        }

        if !loaded {
            info!(".env 파일 없음, 시스템 환경변수와 기본값을 사용합니다");
        }
    }
}

/// 설정 검증 유틸리티
pub fn validate_config(config: &ServerConfig) -> Result<()> {
    if config.port == 0 {
        anyhow::bail!("유효하지 않은 포트 번호: {}", config.port);
    }

    if config.host.is_empty() {
        anyhow::bail!("호스트 주소가 비어있습니다");
    }

    if config.worker_count == 0 {
        anyhow::bail!("워커 수는 1 이상이어야 합니다");
    }

    if config.max_connections == 0 {
        anyhow::bail!("최대 접속 수는 1 이상이어야 합니다");
    }

    if config.db_path.is_empty() {
        anyhow::bail!("DB 파일 경로가 비어있습니다");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 기본값 테스트
    #[test]
    fn test_default_values() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 55014,
            worker_count: 4,
            max_connections: 1000,
            db_path: "db/users.db".to_string(),
            word_file: "words.txt".to_string(),
        };

        assert!(validate_config(&config).is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:55014");
    }

    /// 인자 덮어쓰기 테스트
    #[test]
    fn test_apply_args() {
        let mut config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 55014,
            worker_count: 4,
            max_connections: 1000,
            db_path: "db/users.db".to_string(),
            word_file: "words.txt".to_string(),
        };

        config.apply_args(&["127.0.0.1".to_string(), "6000".to_string()]);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 6000);

        // 잘못된 포트는 무시
        config.apply_args(&["127.0.0.1".to_string(), "abc".to_string()]);
        assert_eq!(config.port, 6000);
    }

    /// 검증 실패 테스트
    #[test]
    fn test_validate_rejects_zero_port() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 0,
            worker_count: 4,
            max_connections: 1000,
            db_path: "db/users.db".to_string(),
            word_file: "words.txt".to_string(),
        };

        assert!(validate_config(&config).is_err());
    }
}
