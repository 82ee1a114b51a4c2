//! 카드 단어 목록 로더

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use super::card::MAX_CARDS;

/// 단어 파일에서 보드용 단어 25개를 로드합니다.
///
/// 파일은 한 줄에 한 단어 형식입니다. 중복 단어는 걸러내고,
/// 파일이 없거나 단어가 부족하면 `단어N` 형태의 자리 표시
/// 단어로 채웁니다. 어떤 경우에도 실패하지 않습니다.
pub fn load_word_list(path: &Path) -> Vec<String> {
    let mut words = Vec::with_capacity(MAX_CARDS);
    let mut seen = HashSet::new();

    match std::fs::read_to_string(path) {
        Ok(contents) => {
            for line in contents.lines() {
                if words.len() >= MAX_CARDS {
                    break;
                }

                let word = line.trim();
                if word.is_empty() || word.contains('|') {
                    continue;
                }

                if seen.insert(word.to_string()) {
                    words.push(word.to_string());
                }
            }

            info!("단어 파일 로드 완료: {} ({}개 단어)", path.display(), words.len());
        }
        Err(e) => {
            warn!("단어 파일 열기 실패: {} - {}", path.display(), e);
        }
    }

    // 단어 부족 시 자리 표시 단어로 채움
    let mut next = words.len() + 1;
    while words.len() < MAX_CARDS {
        let filler = format!("단어{}", next);
        next += 1;
        if seen.insert(filler.clone()) {
            words.push(filler);
        }
    }

    words
}
