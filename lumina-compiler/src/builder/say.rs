use crate::ir::CharId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SayMode {
    /// A named line sets the active speaker; unnamed quoted lines reuse it.
    #[default]
    Default,
    /// Every line, quoted or not, belongs to one speaker.
    Single(CharId),
    /// Unnamed quoted lines cycle through the list.
    Rotation { speakers: Vec<CharId>, next: usize },
}

/// Tracks who is speaking while the builder walks the document.
#[derive(Debug, Clone, Default)]
pub struct Speakers {
    mode: SayMode,
    active: Option<CharId>,
}

impl Speakers {
    pub fn mode(&self) -> &SayMode {
        &self.mode
    }

    pub fn set_mode(&mut self, mode: SayMode) {
        log::debug!("say mode -> {:?}", mode);
        self.mode = mode;
    }

    /// Speaker of a say-line. An explicit name wins over every mode and does
    /// not advance a rotation.
    pub fn say(&mut self, named: Option<CharId>, quoted: bool) -> Option<CharId> {
        if let Some(c) = named {
            if self.mode == SayMode::Default {
                self.active = Some(c);
            }
            return Some(c);
        }
        match &mut self.mode {
            SayMode::Default => self.active.filter(|_| quoted),
            SayMode::Single(c) => Some(*c),
            SayMode::Rotation { speakers, next } => {
                if !quoted || speakers.is_empty() {
                    return None;
                }
                let c = speakers[*next % speakers.len()];
                *next = (*next + 1) % speakers.len();
                Some(c)
            }
        }
    }

    pub fn narration(&self) -> Option<CharId> {
        match self.mode {
            SayMode::Single(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_cycles_quoted_lines_only() {
        let mut s = Speakers::default();
        s.set_mode(SayMode::Rotation { speakers: vec![CharId(0), CharId(1)], next: 0 });
        assert_eq!(s.say(None, true), Some(CharId(0)));
        assert_eq!(s.say(None, false), None);
        assert_eq!(s.say(Some(CharId(5)), true), Some(CharId(5)));
        assert_eq!(s.say(None, true), Some(CharId(1)));
        assert_eq!(s.say(None, true), Some(CharId(0)));
        assert_eq!(s.narration(), None);
    }

    #[test]
    fn default_mode_remembers_last_name() {
        let mut s = Speakers::default();
        assert_eq!(s.say(None, true), None);
        s.say(Some(CharId(2)), false);
        assert_eq!(s.say(None, true), Some(CharId(2)));
    }
}
