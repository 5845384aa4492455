//! 按原文比例对齐译文
//!
//! 对话模型有时会把多段合并输出，返回的段数少于原文。开启排版优化后，
//! 把合并的译文按各段原文长度的比例重新切分，切分点尽量落在空白或标点上。

/// 在目标切分点附近寻找自然断点的范围（字符数）
const BOUNDARY_WINDOW: usize = 8;

fn is_sentence_end(c: char) -> bool {
    matches!(c, '\n' | '.' | '!' | '?' | ';' | '。' | '！' | '？' | '；')
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '。' | '，' | '！' | '？' | '；' | '：' | '、')
}

/// 把译文重新分配到原文各段
///
/// 译文段数不少于原文时原样返回。
pub fn align_by_source_proportion<S: AsRef<str>, T: AsRef<str>>(
    sources: &[S],
    translated: &[T],
) -> Vec<String> {
    if translated.len() >= sources.len() || sources.is_empty() {
        return translated.iter().map(|t| t.as_ref().to_string()).collect();
    }

    let joined = translated
        .iter()
        .map(|t| t.as_ref().trim())
        .collect::<Vec<_>>()
        .join("\n");
    let chars: Vec<char> = joined.chars().collect();

    let weights: Vec<usize> = sources
        .iter()
        .map(|s| s.as_ref().chars().count().max(1))
        .collect();
    let total_weight: usize = weights.iter().sum();

    let mut pieces = Vec::with_capacity(sources.len());
    let mut start = 0usize;
    let mut cumulative = 0usize;

    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        let end = if index + 1 == weights.len() {
            chars.len()
        } else {
            let target = (chars.len() * cumulative + total_weight / 2) / total_weight;
            snap_to_boundary(&chars, target.max(start)).max(start)
        };

        let piece: String = chars[start..end].iter().collect();
        pieces.push(piece.trim().to_string());
        start = end;
    }

    tracing::debug!(
        "按原文比例重新对齐译文: {} 段 -> {} 段",
        translated.len(),
        pieces.len()
    );

    pieces
}

/// 在 target 附近找断点，句末标点优先，返回断点之后的位置
fn snap_to_boundary(chars: &[char], target: usize) -> usize {
    let target = target.min(chars.len());
    find_boundary(chars, target, is_sentence_end)
        .or_else(|| find_boundary(chars, target, is_boundary))
        .unwrap_or(target)
}

fn find_boundary(chars: &[char], target: usize, accept: fn(char) -> bool) -> Option<usize> {
    for distance in 0..=BOUNDARY_WINDOW {
        let forward = target + distance;
        if forward > 0 && forward <= chars.len() && accept(chars[forward - 1]) {
            return Some(forward);
        }
        if distance > 0 && target > distance && accept(chars[target - distance - 1]) {
            return Some(target - distance);
        }
    }
    None
}
