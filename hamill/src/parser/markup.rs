/// The result of reading a quick-markup string such as `#id .class text`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Markup {
    pub id: Option<String>,
    pub class: Option<String>,
    pub text: Option<String>,
}

impl Markup {
    pub fn has_only_text(&self) -> bool {
        self.text.is_some() && self.id.is_none() && self.class.is_none()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum State {
    Idle,
    Class,
    Id,
    Text,
}

/// Read the `.class`, `#id` and free text parts of quick markup.
///
/// A class and an id may each appear once, in any order, before the text.
/// The first other character starts the text, which runs to the end.
pub fn parse_markup(input: &str) -> Markup {
    let mut markup = Markup::default();
    let mut state = State::Idle;

    for c in input.chars() {
        match (state, c) {
            (State::Text, _) => push(&mut markup.text, c),
            (State::Idle, '.') if markup.class.is_none() => {
                state = State::Class;
                markup.class = Some(String::new());
            }
            (State::Idle, '#') if markup.id.is_none() => {
                state = State::Id;
                markup.id = Some(String::new());
            }
            (State::Class | State::Id | State::Idle, ' ') => state = State::Idle,
            (State::Class, _) => push(&mut markup.class, c),
            (State::Id, _) => push(&mut markup.id, c),
            (State::Idle, _) => {
                state = State::Text;
                push(&mut markup.text, c);
            }
        }
    }

    markup.class = markup.class.filter(|s| !s.is_empty());
    markup.id = markup.id.filter(|s| !s.is_empty());
    markup.text = markup
        .text
        .map(|s| s.trim_end().to_string())
        .filter(|s| !s.is_empty());
    markup
}

fn push(slot: &mut Option<String>, c: char) {
    slot.get_or_insert_with(String::new).push(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_class_and_text() {
        assert_eq!(
            parse_markup("#myid .myclass some text"),
            Markup {
                id: Some("myid".into()),
                class: Some("myclass".into()),
                text: Some("some text".into()),
            }
        );
    }

    #[test]
    fn order_does_not_matter() {
        let markup = parse_markup(".c #i");
        assert_eq!(markup.id.as_deref(), Some("i"));
        assert_eq!(markup.class.as_deref(), Some("c"));
        assert_eq!(markup.text, None);
    }

    #[test]
    fn marks_after_text_are_text() {
        let markup = parse_markup("begin .late");
        assert!(markup.has_only_text());
        assert_eq!(markup.text.as_deref(), Some("begin .late"));
    }

    #[test]
    fn second_class_is_text() {
        let markup = parse_markup(".a .b");
        assert_eq!(markup.class.as_deref(), Some("a"));
        assert_eq!(markup.text.as_deref(), Some(".b"));
    }

    #[test]
    fn empty() {
        assert_eq!(parse_markup(""), Markup::default());
    }
}
