use crate::evaluation::ScoreBand;
use crate::models::DataMode;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};

/// 分数分档对应的样式
pub fn band_style(band: ScoreBand) -> Style {
    match band {
        ScoreBand::High => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ScoreBand::Medium => Style::default().fg(Color::Yellow),
        ScoreBand::Low => Style::default().fg(Color::LightRed),
        ScoreBand::NotEvaluated => Style::default().fg(Color::DarkGray),
    }
}

/// 评测状态样式，未完成时醒目显示
pub fn status_style(not_completed: bool) -> Style {
    if not_completed {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Green)
    }
}

/// 数据来源标记的颜色
pub fn mode_color(mode: DataMode) -> Color {
    match mode {
        DataMode::Live => Color::Green,
        DataMode::Mock => Color::Yellow,
    }
}

pub fn checkbox(checked: bool) -> &'static str {
    if checked { "[x]" } else { "[ ]" }
}

/// 按字符截断，超出部分用省略号代替
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}

/// 计算居中的弹出窗口区域
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
