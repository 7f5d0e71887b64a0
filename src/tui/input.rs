use crate::models::KeybindingsConfig;
use crossterm::event::{KeyCode, KeyEvent};

/// 输入处理器，负责将按键事件映射到应用操作
pub struct InputHandler {
    keybindings: KeybindingsConfig,
}

/// 用户操作类型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserAction {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Toggle,
    Confirm,
    Cancel,
    Help,
    Refresh,
    AddModel,
    Update,
    Delete,
    Health,
    ReloadMock,
    SelectAll,
    InvertSelection,
    SwitchView,
    None,
}

impl InputHandler {
    pub fn new(keybindings: KeybindingsConfig) -> Self {
        Self { keybindings }
    }

    /// 处理按键事件，返回对应的用户操作
    pub fn handle_key_event(&self, key_event: KeyEvent) -> UserAction {
        // Esc 固定用于取消，不参与配置
        if key_event.code == KeyCode::Esc {
            return UserAction::Cancel;
        }
        let Some(key_str) = key_name(key_event.code) else {
            return UserAction::None;
        };

        // 构建操作映射表
        let action_map = self.build_action_map();

        // 查找匹配的操作
        self.find_matching_action(&key_str, &action_map)
    }

    /// 构建操作映射表
    fn build_action_map(&self) -> [(&str, UserAction); 17] {
        let k = &self.keybindings;
        [
            (&k.quit, UserAction::Quit),
            (&k.up, UserAction::MoveUp),
            (&k.down, UserAction::MoveDown),
            (&k.left, UserAction::MoveLeft),
            (&k.right, UserAction::MoveRight),
            (&k.toggle, UserAction::Toggle),
            (&k.confirm, UserAction::Confirm),
            (&k.help, UserAction::Help),
            (&k.refresh, UserAction::Refresh),
            (&k.add, UserAction::AddModel),
            (&k.update, UserAction::Update),
            (&k.delete, UserAction::Delete),
            (&k.health, UserAction::Health),
            (&k.reload_mock, UserAction::ReloadMock),
            (&k.select_all, UserAction::SelectAll),
            (&k.invert_selection, UserAction::InvertSelection),
            (&k.switch_view, UserAction::SwitchView),
        ]
    }

    /// 查找匹配的操作，配置中的键名不区分大小写
    fn find_matching_action(&self, key_str: &str, action_map: &[(&str, UserAction)]) -> UserAction {
        for (key, action) in action_map {
            if key_str == *key || (key.len() > 1 && key_str.eq_ignore_ascii_case(key)) {
                return *action;
            }
        }
        UserAction::None
    }
}

/// 按键在配置文件中的名称
fn key_name(code: KeyCode) -> Option<String> {
    let name = match code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::F(n) => format!("f{}", n),
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_handler() {
        let input_handler = InputHandler::new(KeybindingsConfig::default());

        // 测试退出键
        let quit_event = KeyEvent::from(KeyCode::Char('q'));
        assert_eq!(input_handler.handle_key_event(quit_event), UserAction::Quit);

        // 测试空格和回车
        let toggle_event = KeyEvent::from(KeyCode::Char(' '));
        assert_eq!(input_handler.handle_key_event(toggle_event), UserAction::Toggle);
        let confirm_event = KeyEvent::from(KeyCode::Enter);
        assert_eq!(input_handler.handle_key_event(confirm_event), UserAction::Confirm);

        // 测试视图切换
        let tab_event = KeyEvent::from(KeyCode::Tab);
        assert_eq!(input_handler.handle_key_event(tab_event), UserAction::SwitchView);

        // 测试方向键
        let up_event = KeyEvent::from(KeyCode::Up);
        assert_eq!(input_handler.handle_key_event(up_event), UserAction::MoveUp);

        // 测试ESC键
        let esc_event = KeyEvent::from(KeyCode::Esc);
        assert_eq!(input_handler.handle_key_event(esc_event), UserAction::Cancel);

        // 未绑定的键
        let unbound_event = KeyEvent::from(KeyCode::Char('z'));
        assert_eq!(input_handler.handle_key_event(unbound_event), UserAction::None);
    }

    #[test]
    fn test_default_action_keys() {
        let input_handler = InputHandler::new(KeybindingsConfig::default());
        let cases = [
            ('r', UserAction::Refresh),
            ('n', UserAction::AddModel),
            ('w', UserAction::Update),
            ('d', UserAction::Delete),
            ('h', UserAction::Health),
            ('m', UserAction::ReloadMock),
            ('a', UserAction::SelectAll),
            ('i', UserAction::InvertSelection),
            ('?', UserAction::Help),
        ];
        for (c, expected) in cases {
            assert_eq!(
                input_handler.handle_key_event(KeyEvent::from(KeyCode::Char(c))),
                expected,
                "key {}",
                c
            );
        }
    }

    #[test]
    fn test_custom_keybindings() {
        let keybindings = KeybindingsConfig {
            up: "k".to_string(),
            down: "j".to_string(),
            left: "h".to_string(),
            right: "l".to_string(),
            quit: "x".to_string(),
            health: "H".to_string(),
            switch_view: "Tab".to_string(),
            ..KeybindingsConfig::default()
        };

        let input_handler = InputHandler::new(keybindings);

        // 测试自定义退出键
        let quit_event = KeyEvent::from(KeyCode::Char('x'));
        assert_eq!(input_handler.handle_key_event(quit_event), UserAction::Quit);

        // 测试vim风格移动键
        let up_event = KeyEvent::from(KeyCode::Char('k'));
        assert_eq!(input_handler.handle_key_event(up_event), UserAction::MoveUp);

        let left_event = KeyEvent::from(KeyCode::Char('h'));
        assert_eq!(input_handler.handle_key_event(left_event), UserAction::MoveLeft);

        // 单字符键区分大小写，键名不区分
        let health_event = KeyEvent::from(KeyCode::Char('H'));
        assert_eq!(input_handler.handle_key_event(health_event), UserAction::Health);
        let tab_event = KeyEvent::from(KeyCode::Tab);
        assert_eq!(input_handler.handle_key_event(tab_event), UserAction::SwitchView);
    }
}
