use std::collections::VecDeque;

/// Back/forward navigation record, the terminal-client analogue of browser
/// history. The current path plus both stacks are the only durable
/// client-side navigation state.
#[derive(Debug, Default)]
pub struct HistoryState {
    back_stack: VecDeque<String>,
    forward_stack: VecDeque<String>,
    current: Option<String>,
    capacity: usize,
}

impl HistoryState {
    pub fn new(capacity: usize) -> Self {
        Self {
            back_stack: VecDeque::new(),
            forward_stack: VecDeque::new(),
            current: None,
            capacity: capacity.max(1),
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn back_len(&self) -> usize {
        self.back_stack.len()
    }

    pub fn forward_len(&self) -> usize {
        self.forward_stack.len()
    }

    /// Records a fresh navigation: the current path moves onto the back
    /// stack and any forward entries are discarded.
    pub fn record(&mut self, path: &str) {
        if let Some(previous) = self.current.replace(path.to_string()) {
            if self.back_stack.len() >= self.capacity {
                self.back_stack.pop_front();
            }
            self.back_stack.push_back(previous);
        }
        self.forward_stack.clear();
    }

    /// Steps back, returning the path to replay. Does not re-record.
    pub fn go_back(&mut self) -> Option<String> {
        let target = self.back_stack.pop_back()?;
        if let Some(current) = self.current.replace(target.clone()) {
            if self.forward_stack.len() >= self.capacity {
                self.forward_stack.pop_front();
            }
            self.forward_stack.push_back(current);
        }
        Some(target)
    }

    /// Steps forward, returning the path to replay. Does not re-record.
    pub fn go_forward(&mut self) -> Option<String> {
        let target = self.forward_stack.pop_back()?;
        if let Some(current) = self.current.replace(target.clone()) {
            if self.back_stack.len() >= self.capacity {
                self.back_stack.pop_front();
            }
            self.back_stack.push_back(current);
        }
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::HistoryState;

    #[test]
    fn record_pushes_previous_and_clears_forward() {
        let mut history = HistoryState::new(8);
        history.record("/");
        history.record("/customer");
        history.record("/tracking/1");

        assert_eq!(history.current(), Some("/tracking/1"));
        assert_eq!(history.back_len(), 2);

        let back = history.go_back().expect("back entry should exist");
        assert_eq!(back, "/customer");
        assert_eq!(history.forward_len(), 1);

        // A fresh navigation discards the forward branch.
        history.record("/driver/dashboard");
        assert_eq!(history.forward_len(), 0);
        assert_eq!(history.current(), Some("/driver/dashboard"));
    }

    #[test]
    fn back_and_forward_round_trip() {
        let mut history = HistoryState::new(8);
        history.record("/");
        history.record("/customer");

        assert_eq!(history.go_back(), Some("/".to_string()));
        assert_eq!(history.go_forward(), Some("/customer".to_string()));
        assert_eq!(history.go_forward(), None);
        assert_eq!(history.current(), Some("/customer"));
    }

    #[test]
    fn back_stack_is_bounded() {
        let mut history = HistoryState::new(3);
        for i in 0..10 {
            history.record(&format!("/tracking/{i}"));
        }
        assert_eq!(history.back_len(), 3);
        assert_eq!(history.go_back(), Some("/tracking/8".to_string()));
    }

    #[test]
    fn empty_history_has_nowhere_to_go() {
        let mut history = HistoryState::new(4);
        assert_eq!(history.go_back(), None);
        assert_eq!(history.go_forward(), None);
    }
}
