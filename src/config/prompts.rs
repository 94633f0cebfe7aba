//! System prompts for the vision model.

use chrono::{Datelike, Local};

use crate::actions::CoordinateSystem;

/// Build the system prompt for a language tag ("en" or Chinese otherwise).
pub fn system_prompt(lang: &str, coordinates: CoordinateSystem, width: u32, height: u32) -> String {
    match lang {
        "en" => format!(
            "{}\n{}\n\n{}\n{}",
            date_header_en(width, height),
            FORMAT_EN,
            coordinate_section_en(coordinates, width, height),
            ACTIONS_EN
        ),
        _ => format!(
            "{}\n{}\n\n{}\n{}",
            date_header_zh(width, height),
            FORMAT_ZH,
            coordinate_section_zh(coordinates, width, height),
            ACTIONS_ZH
        ),
    }
}

fn date_header_zh(width: u32, height: u32) -> String {
    const WEEKDAYS: [&str; 7] = [
        "星期一", "星期二", "星期三", "星期四", "星期五", "星期六", "星期日",
    ];
    let today = Local::now();
    let weekday = WEEKDAYS[today.weekday().num_days_from_monday() as usize];

    format!(
        "今天的日期是: {} {}\n当前屏幕分辨率: {}x{} (宽x高)",
        today.format("%Y年%m月%d日"),
        weekday,
        width,
        height
    )
}

fn date_header_en(width: u32, height: u32) -> String {
    format!(
        "Today's date is: {}\nCurrent screen resolution: {}x{} (width x height)",
        Local::now().format("%B %d, %Y"),
        width,
        height
    )
}

fn coordinate_section_zh(coordinates: CoordinateSystem, width: u32, height: u32) -> String {
    match coordinates {
        CoordinateSystem::Absolute => format!(
            "【坐标系统】\n所有坐标均为绝对像素坐标，原点为屏幕左上角 (0, 0)。\n\
             X 必须在 [0, {}) 内，Y 必须在 [0, {}) 内，超出范围的操作会被拒绝并返回错误。",
            width, height
        ),
        CoordinateSystem::Relative => "【坐标系统】\n所有坐标均为相对坐标，范围 0 到 999，\
             (0, 0) 为左上角，(999, 999) 为右下角，超出范围的操作会被拒绝并返回错误。"
            .to_string(),
    }
}

fn coordinate_section_en(coordinates: CoordinateSystem, width: u32, height: u32) -> String {
    match coordinates {
        CoordinateSystem::Absolute => format!(
            "[Coordinates]\nAll coordinates are absolute pixels with the origin (0, 0) at the top-left corner.\n\
             X must be within [0, {}) and Y within [0, {}); anything outside is rejected with an error.",
            width, height
        ),
        CoordinateSystem::Relative => "[Coordinates]\nAll coordinates are relative, from 0 to 999 on each axis: \
             (0, 0) is the top-left corner and (999, 999) the bottom-right. Anything outside is rejected with an error."
            .to_string(),
    }
}

const FORMAT_ZH: &str = r#"你是一个手机操作智能体，根据任务、操作历史和当前截图，每次只决定下一步的一个操作。
你必须严格按照以下格式输出：
<think>{think}</think>
<answer>{action}</answer>

其中 {think} 是选择该操作的简短理由，{action} 是下方定义的一条操作指令。每次回答只会执行第一条指令。"#;

const FORMAT_EN: &str = r#"You are a phone-operating agent. Given the task, the operation history and the current screenshot, decide the single next operation.
You must answer strictly in this format:
<think>{think}</think>
<answer>{action}</answer>

{think} is a short reason for the choice and {action} is one instruction defined below. Only the first instruction in an answer is executed."#;

const ACTIONS_ZH: &str = r#"
可用指令：
- do(action="Launch", app="xxx")
    直接启动目标应用，app 必须是应用的名称（例如 "微信"、"Chrome"）。
- do(action="Tap", element=[x,y])
    点击屏幕上的一个点。
- do(action="Swipe", start=[x1,y1], end=[x2,y2])
    从起点滑动到终点，用于滚动或翻页。起点应避开底部固定栏。
- do(action="Type", text="xxx")
    在当前聚焦的输入框中输入文本，输入前会自动清空原有内容。请先点击输入框。
- do(action="Wait", duration="x seconds")
    等待页面加载。
- finish(message="xxx")
    任务已准确完整地完成，message 为结果说明。
- fail(reason="xxx")
    任务无法完成（例如需要登录或验证码），reason 为原因。

规则：
1. 操作前先确认当前应用是否为目标应用，如果不是，先执行 Launch。
2. 如果上一步返回了错误（例如应用未找到或坐标越界），请根据错误信息修正后再试。
3. 页面未加载时最多连续 Wait 三次。
4. 执行下一步前检查上一步是否生效，不生效时调整位置重试。
5. 结束前仔细确认任务是否完整准确地完成。"#;

const ACTIONS_EN: &str = r#"
Available instructions:
- do(action="Launch", app="xxx")
    Start the target app directly. app must be the app's name (for example "Chrome" or "微信").
- do(action="Tap", element=[x,y])
    Tap a point on the screen.
- do(action="Swipe", start=[x1,y1], end=[x2,y2])
    Swipe from start to end to scroll or page. Keep the start point off fixed bottom bars.
- do(action="Type", text="xxx")
    Type into the focused input field. Existing text is cleared first. Tap the field before typing.
- do(action="Wait", duration="x seconds")
    Wait for the page to load.
- finish(message="xxx")
    The task is fully and accurately done; message describes the result.
- fail(reason="xxx")
    The task cannot be completed (for example a login or captcha is required); reason explains why.

Rules:
1. Before acting, check whether the current app is the target app. If it is not, Launch it first.
2. If the previous step returned an error (such as an unknown app or out-of-range coordinates), correct it using the error message and try again.
3. Wait at most three times in a row for a page to load.
4. Check that the previous operation took effect before the next one; adjust the position and retry if it did not.
5. Before finishing, verify carefully that the task is complete and accurate."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_languages() {
        let zh = system_prompt("cn", CoordinateSystem::Absolute, 1080, 1920);
        assert!(zh.contains("今天的日期是"));
        assert!(zh.contains("当前屏幕分辨率: 1080x1920"));
        assert!(zh.contains("[0, 1080)"));

        let en = system_prompt("en", CoordinateSystem::Absolute, 1080, 1920);
        assert!(en.contains("Today's date is"));
        assert!(en.contains("Current screen resolution: 1080x1920"));
        assert!(en.contains("fail(reason="));
    }

    #[test]
    fn test_relative_coordinate_section() {
        let en = system_prompt("en", CoordinateSystem::Relative, 1080, 1920);
        assert!(en.contains("from 0 to 999"));
        assert!(!en.contains("[0, 1080)"));
    }
}
