//! 流式响应累积
//!
//! 对话模型按 token 推送输出，`StreamingSession` 把它们累积成完整文本，
//! 同时把每次新增的部分交给回调。会话结束后再推送的 token 会被忽略。

/// 增量回调，只接收本次追加的子串
pub type DeltaCallback = Box<dyn FnMut(&str) + Send>;

/// 创建流式会话的入口
pub struct StreamAccumulator;

impl StreamAccumulator {
    pub fn start<F>(on_delta: F) -> StreamingSession
    where
        F: FnMut(&str) + Send + 'static,
    {
        StreamingSession {
            buffer: String::new(),
            on_delta: Some(Box::new(on_delta)),
            finished: false,
            tokens: 0,
        }
    }

    /// 不需要增量通知时使用
    pub fn silent() -> StreamingSession {
        StreamingSession {
            buffer: String::new(),
            on_delta: None,
            finished: false,
            tokens: 0,
        }
    }
}

/// 单个流式请求的累积状态
pub struct StreamingSession {
    buffer: String,
    on_delta: Option<DeltaCallback>,
    finished: bool,
    tokens: usize,
}

impl StreamingSession {
    /// 追加一个 token
    pub fn push(&mut self, token: &str) {
        if self.finished {
            tracing::trace!("流已结束，忽略迟到的 token");
            return;
        }
        if token.is_empty() {
            return;
        }

        self.buffer.push_str(token);
        self.tokens += 1;

        if let Some(callback) = self.on_delta.as_mut() {
            callback(token);
        }
    }

    /// 当前已累积的文本
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn token_count(&self) -> usize {
        self.tokens
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 结束会话并返回完整文本，之后的 push 不再生效
    pub fn finish(&mut self) -> String {
        if !self.finished {
            self.finished = true;
            self.on_delta = None;
            tracing::debug!("流式响应结束: {} 个 token，{} 字节", self.tokens, self.buffer.len());
        }
        self.buffer.clone()
    }
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession")
            .field("buffer_len", &self.buffer.len())
            .field("tokens", &self.tokens)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_deltas_and_buffer() {
        let deltas = Arc::new(Mutex::new(Vec::new()));
        let sink = deltas.clone();
        let mut session = StreamAccumulator::start(move |delta| {
            sink.lock().unwrap().push(delta.to_string());
        });

        session.push("Bon");
        assert_eq!(session.buffer(), "Bon");
        session.push("jour");
        session.push("");

        assert_eq!(session.finish(), "Bonjour");
        assert_eq!(*deltas.lock().unwrap(), vec!["Bon".to_string(), "jour".to_string()]);
        assert_eq!(session.token_count(), 2);
    }

    #[test]
    fn test_push_after_finish_is_ignored() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let mut session = StreamAccumulator::start(move |_| *counter.lock().unwrap() += 1);

        session.push("a");
        assert_eq!(session.finish(), "a");
        session.push("b");

        assert!(session.is_finished());
        assert_eq!(session.buffer(), "a");
        assert_eq!(session.finish(), "a");
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
