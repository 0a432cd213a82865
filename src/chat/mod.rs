//! AI chat orchestrator
//!
//! 无状态请求处理：把一段消息历史变成一条 assistant 回复，
//! 模型要求时自动执行 `create_task`，tool 往返次数有固定上限。
//! 每次调用相互独立，跨请求不保留任何状态。

pub mod client;
pub mod stream;
pub mod tools;

pub use client::{ChatModel, GatewayClient, WireMessage};
pub use stream::SseAccumulator;

use crate::error::Result;
use crate::model::ChatMessage;
use crate::store::TaskStore;

/// tool 调用循环上限
pub const MAX_TOOL_ITERATIONS: usize = 5;

/// 模型无文本输出时的兜底回复
const FALLBACK_CONTENT: &str = "Done!";

/// 固定的 system 指令
const SYSTEM_PROMPT: &str = "\
You are a helpful AI project management assistant embedded in a Kanban board app called TaskFlow. You help users:
- Plan and break down work into tasks
- Create tasks on the board using the create_task tool
- Suggest task priorities and assignments
- Answer questions about project management best practices
- Help with sprint planning and estimation

When users ask you to create a task, ALWAYS use the create_task tool. You can create multiple tasks if needed.
Keep answers clear, concise, and actionable. Use markdown formatting.";

/// 一次 chat 请求的最终结果
#[derive(Debug)]
pub struct ChatOutcome {
    /// assistant 的最终文本
    pub content: String,
    /// 是否发生过至少一轮 tool 执行
    pub tasks_created: bool,
}

/// 构造发给模型的完整会话：固定 system 指令 + 用户历史
pub fn build_conversation(messages: &[ChatMessage]) -> Vec<WireMessage> {
    let mut conversation = Vec::with_capacity(messages.len() + 1);
    conversation.push(WireMessage::system(SYSTEM_PROMPT));
    conversation.extend(messages.iter().map(WireMessage::from));
    conversation
}

/// 运行有界 tool 调用循环
///
/// 状态机：AwaitingModel → (有 tool calls?) → ExecutingTools → AwaitingModel → … → Done。
/// 终止条件：模型不再请求 tool，或迭代到达上限，先到者为准。
/// tool 调用严格顺序执行——同一轮内靠后的调用可能依赖前面建立的会话状态。
pub async fn run_chat(
    model: &dyn ChatModel,
    store: &TaskStore,
    messages: &[ChatMessage],
) -> Result<ChatOutcome> {
    let tools = tools::tool_schema();
    let mut conversation = build_conversation(messages);

    // 首次调用失败原样上抛（429 区分于其他上游错误）
    let mut assistant = model.complete(&conversation, &tools).await?;

    let mut iterations = 0;
    while assistant.has_tool_calls() && iterations < MAX_TOOL_ITERATIONS {
        iterations += 1;
        conversation.push(assistant.clone());

        for call in assistant.tool_calls.as_deref().unwrap_or_default() {
            let result = tools::dispatch(store, &call.function.name, &call.function.arguments).await;
            conversation.push(WireMessage::tool_result(&call.id, result));
        }

        // tool 执行后的 follow-up。失败不重试：保留上一条 assistant 消息收尾。
        match model.complete(&conversation, &tools).await {
            Ok(next) => assistant = next,
            Err(e) => {
                eprintln!("[chat] follow-up call failed: {e}");
                break;
            }
        }
    }

    let content = assistant
        .content
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| FALLBACK_CONTENT.to_string());

    Ok(ChatOutcome {
        content,
        tasks_created: iterations > 0,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::client::{FunctionCall, ToolCall};
    use super::*;
    use crate::error::TaskFlowError;
    use crate::model::{ChatRole, TaskPriority};
    use crate::storage::sqlite::SqliteTaskTable;

    /// 按脚本逐条返回响应的 mock 模型；脚本耗尽后重复最后一条
    struct ScriptedModel {
        responses: Mutex<Vec<std::result::Result<WireMessage, ()>>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(responses: Vec<std::result::Result<WireMessage, ()>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _messages: &[WireMessage], _tools: &Value) -> Result<WireMessage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            };
            next.map_err(|_| TaskFlowError::upstream("scripted failure"))
        }
    }

    /// 始终 429 的 mock 模型
    struct RateLimitedModel;

    #[async_trait]
    impl ChatModel for RateLimitedModel {
        async fn complete(&self, _messages: &[WireMessage], _tools: &Value) -> Result<WireMessage> {
            Err(TaskFlowError::RateLimited)
        }
    }

    fn text_response(content: &str) -> std::result::Result<WireMessage, ()> {
        Ok(WireMessage {
            role: "assistant".to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        })
    }

    fn tool_response(arguments: &str) -> std::result::Result<WireMessage, ()> {
        Ok(WireMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(vec![ToolCall {
                id: "call_1".to_string(),
                kind: "function".to_string(),
                function: FunctionCall {
                    name: "create_task".to_string(),
                    arguments: arguments.to_string(),
                },
            }]),
            tool_call_id: None,
        })
    }

    fn store() -> TaskStore {
        TaskStore::new(Arc::new(SqliteTaskTable::open_in_memory().unwrap()))
    }

    fn user_message(content: &str) -> Vec<ChatMessage> {
        vec![ChatMessage {
            role: ChatRole::User,
            content: content.to_string(),
        }]
    }

    #[tokio::test]
    async fn test_plain_answer_without_tools() {
        let model = ScriptedModel::new(vec![text_response("Try timeboxing.")]);
        let store = store();

        let outcome = run_chat(&model, &store, &user_message("any tips?"))
            .await
            .unwrap();

        assert_eq!(outcome.content, "Try timeboxing.");
        assert!(!outcome.tasks_created);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tool_call_creates_task_and_confirms() {
        let model = ScriptedModel::new(vec![
            tool_response(
                r#"{"title":"write the launch email","due_date":"2025-06-01","priority":"high"}"#,
            ),
            text_response("Created \"write the launch email\" for you."),
        ]);
        let store = store();

        let outcome = run_chat(
            &model,
            &store,
            &user_message("Add a task to write the launch email, due 2025-06-01, high priority"),
        )
        .await
        .unwrap();

        assert!(outcome.tasks_created);
        assert!(outcome.content.contains("launch email"));

        let tasks = store.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "write the launch email");
        assert_eq!(tasks[0].priority, TaskPriority::High);
        assert_eq!(
            tasks[0].due_date,
            chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
        );
    }

    #[tokio::test]
    async fn test_loop_is_bounded_at_five_iterations() {
        // 模型永远继续要求 tool：恰好执行 5 轮后停下，不会无限循环
        let model = ScriptedModel::new(vec![tool_response(r#"{"title":"another one"}"#)]);
        let store = store();

        let outcome = run_chat(&model, &store, &user_message("keep going"))
            .await
            .unwrap();

        assert!(outcome.tasks_created);
        // 最后一条 assistant 消息没有文本，落到兜底回复
        assert_eq!(outcome.content, "Done!");
        // 首次调用 + 每轮一次 follow-up
        assert_eq!(model.calls.load(Ordering::SeqCst), 1 + MAX_TOOL_ITERATIONS);
        assert_eq!(store.list().await.unwrap().len(), MAX_TOOL_ITERATIONS);
    }

    #[tokio::test]
    async fn test_rate_limit_on_first_call_propagates() {
        let store = store();
        let err = run_chat(&RateLimitedModel, &store, &user_message("hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, TaskFlowError::RateLimited));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_follow_up_ends_loop_with_fallback() {
        let model = ScriptedModel::new(vec![tool_response(r#"{"title":"solo task"}"#), Err(())]);
        let store = store();

        let outcome = run_chat(&model, &store, &user_message("add one"))
            .await
            .unwrap();

        // tool 已执行，follow-up 失败只是提前收尾
        assert!(outcome.tasks_created);
        assert_eq!(outcome.content, "Done!");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_error_is_fed_back_not_raised() {
        // 第一轮请求一个未知 tool，模型收到错误后改口
        let model = ScriptedModel::new(vec![
            Ok(WireMessage {
                role: "assistant".to_string(),
                content: None,
                tool_calls: Some(vec![ToolCall {
                    id: "call_1".to_string(),
                    kind: "function".to_string(),
                    function: FunctionCall {
                        name: "archive_board".to_string(),
                        arguments: "{}".to_string(),
                    },
                }]),
                tool_call_id: None,
            }),
            text_response("I can't archive boards, only create tasks."),
        ]);
        let store = store();

        let outcome = run_chat(&model, &store, &user_message("archive it"))
            .await
            .unwrap();

        assert_eq!(outcome.content, "I can't archive boards, only create tasks.");
        assert!(store.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_conversation_starts_with_system_prompt() {
        let conversation = build_conversation(&user_message("hello"));
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation[0].role, "system");
        assert!(conversation[0]
            .content
            .as_deref()
            .unwrap()
            .contains("create_task"));
        assert_eq!(conversation[1].role, "user");
    }
}
