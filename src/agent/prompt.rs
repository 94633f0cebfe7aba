//! Conversation construction for each inference call.
//!
//! The message list is rebuilt from the task history every step. Only the
//! current turn carries a screenshot; earlier turns are replayed as text.

use serde_json::Value;

use super::task::{Observation, Task};
use crate::model::MessageBuilder;

/// Shown as the current app when the foreground package is unknown.
pub const SYSTEM_HOME: &str = "System Home";

pub fn build_messages(
    task: &Task,
    system_prompt: &str,
    observation: &Observation,
    screenshot_base64: &str,
) -> Vec<Value> {
    let mut messages = Vec::with_capacity(task.history().len() * 2 + 2);
    messages.push(MessageBuilder::create_system_message(system_prompt));

    let mut feedback: Option<String> = None;
    for (idx, record) in task.history().iter().enumerate() {
        let instruction = (idx == 0).then(|| task.instruction());
        let text = user_turn(instruction, &record.observation, feedback.take());
        messages.push(MessageBuilder::create_user_message(&text, None));
        messages.push(MessageBuilder::create_assistant_message(&format!(
            "<think>{}</think><answer>{}</answer>",
            record.response.thinking, record.response.action
        )));
        feedback = record.feedback();
    }

    let instruction = task.history().is_empty().then(|| task.instruction());
    let text = user_turn(instruction, observation, feedback);
    messages.push(MessageBuilder::create_user_message(&text, Some(screenshot_base64)));

    messages
}

fn user_turn(instruction: Option<&str>, observation: &Observation, feedback: Option<String>) -> String {
    let screen_info = MessageBuilder::build_screen_info(&observation.current_app);
    let mut text = match instruction {
        Some(task) => format!("{}\n\n{}", task, screen_info),
        None => format!("** Screen Info **\n\n{}", screen_info),
    };

    if let Some(feedback) = feedback {
        text = format!("** Previous Action Error **\n{}\n\n{}", feedback, text);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::TranslateError;
    use crate::agent::error::AgentError;
    use crate::agent::task::{StepOutcome, StepRecord};
    use crate::model::ModelResponse;

    fn observation(app: &str) -> Observation {
        Observation {
            width: 1080,
            height: 1920,
            current_app: app.to_string(),
            is_sensitive: false,
        }
    }

    #[test]
    fn test_first_turn_carries_task_and_image() {
        let task = Task::new("打开微信", 10, "cn");
        let messages = build_messages(&task, "system", &observation(SYSTEM_HOME), "img");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"][0]["type"], "image_url");
        let text = messages[1]["content"][1]["text"].as_str().unwrap();
        assert!(text.starts_with("打开微信"));
        assert!(text.contains("System Home"));
    }

    #[test]
    fn test_history_is_replayed_without_images_and_errors_are_surfaced() {
        let mut task = Task::new("open Foo", 10, "en");
        task.record(StepRecord {
            step: 1,
            observation: observation(SYSTEM_HOME),
            response: ModelResponse::from_content(
                "<think>launch</think><answer>do(action=\"Launch\", app=\"Foo\")</answer>",
            ),
            action: None,
            command: None,
            outcome: StepOutcome::Error(AgentError::from(TranslateError::UnknownApp(
                "Foo".into(),
            ))),
        });

        let messages = build_messages(&task, "system", &observation("Chrome"), "img");
        assert_eq!(messages.len(), 4);

        let replayed = &messages[1]["content"];
        assert_eq!(replayed.as_array().unwrap().len(), 1);
        assert!(replayed[0]["text"].as_str().unwrap().starts_with("open Foo"));

        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(
            messages[2]["content"],
            "<think>launch</think><answer>do(action=\"Launch\", app=\"Foo\")</answer>"
        );

        let current = messages[3]["content"][1]["text"].as_str().unwrap();
        assert!(current.contains("[unknown-app] App not found: Foo"));
        assert!(current.contains("Chrome"));
        assert!(!current.contains("open Foo"));
    }
}
