//! SSE 增量流解码
//!
//! gateway 的流式响应是 `data: ` 前缀的 JSON 片段行，以 `[DONE]` 结尾。
//! 解码器按字节喂入：跨块截断的 UTF-8 序列留在字节缓冲区等待补全，
//! 按换行切分后解析不完整的行推回文本缓冲区等待更多字节——
//! 永远不丢弃半截数据。

use serde_json::Value;

/// 流式增量累积器
///
/// 喂入任意切分的字节块，产出 `choices[0].delta.content` 文本片段。
pub struct SseAccumulator {
    /// 尚未解码完成的字节（末尾可能是被截断的多字节序列）
    pending: Vec<u8>,
    /// 已解码、尚未按行消费的文本
    buffer: String,
    done: bool,
}

impl Default for SseAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SseAccumulator {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            buffer: String::new(),
            done: false,
        }
    }

    /// 流是否已经看到 `[DONE]` 终止符
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// 把 pending 中当前可解码的前缀挪进文本缓冲区。
    /// 末尾被截断的多字节序列保留在 pending，等下一块补全；
    /// 真正非法的字节以 U+FFFD 替换后跳过，不会卡住流。
    fn decode_pending(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            self.buffer.push('\u{FFFD}');
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            // 块边界截断的序列：保留，等更多字节
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// 追加一个字节块，返回本次解出的内容片段（按出现顺序）
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut fragments = Vec::new();
        if self.done {
            return fragments;
        }
        self.pending.extend_from_slice(chunk);
        self.decode_pending();

        while let Some(idx) = self.buffer.find('\n') {
            let mut line: String = self.buffer[..idx].to_string();
            self.buffer.drain(..=idx);
            if line.ends_with('\r') {
                line.pop();
            }

            let Some(payload) = line.strip_prefix("data: ") else {
                continue;
            };
            let payload = payload.trim();
            if payload == "[DONE]" {
                self.done = true;
                break;
            }

            match serde_json::from_str::<Value>(payload) {
                Ok(parsed) => {
                    if let Some(content) = parsed["choices"][0]["delta"]["content"].as_str() {
                        if !content.is_empty() {
                            fragments.push(content.to_string());
                        }
                    }
                }
                Err(_) => {
                    // 行已换行终止但 JSON 不完整：推回缓冲区，等下一块再试
                    let rest = std::mem::take(&mut self.buffer);
                    self.buffer = format!("{line}\n{rest}");
                    break;
                }
            }
        }

        fragments
    }
}
