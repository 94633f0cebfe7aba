//! Console labels for verbose runs, per prompt language.

/// Labels printed around each step when `verbose` is on.
#[derive(Debug, Clone)]
pub struct Messages {
    pub thinking: &'static str,
    pub action: &'static str,
    pub step: &'static str,
    pub step_error: &'static str,
    pub task_completed: &'static str,
    pub task_failed: &'static str,
    pub step_limit_exceeded: &'static str,
}

pub static MESSAGES_ZH: Messages = Messages {
    thinking: "思考过程",
    action: "执行动作",
    step: "步骤",
    step_error: "步骤错误",
    task_completed: "任务完成",
    task_failed: "任务失败",
    step_limit_exceeded: "已达到最大步数",
};

pub static MESSAGES_EN: Messages = Messages {
    thinking: "Thinking",
    action: "Action",
    step: "Step",
    step_error: "Step error",
    task_completed: "Task Completed",
    task_failed: "Task Failed",
    step_limit_exceeded: "Step limit reached",
};

/// Labels for a language tag: "en" for English, anything else for Chinese.
pub fn get_messages(lang: &str) -> &'static Messages {
    match lang {
        "en" => &MESSAGES_EN,
        _ => &MESSAGES_ZH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_messages() {
        assert_eq!(get_messages("cn").thinking, "思考过程");
        assert_eq!(get_messages("en").thinking, "Thinking");
        assert_eq!(get_messages("fr").task_failed, "任务失败");
    }
}
