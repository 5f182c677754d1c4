//! A small CSS selector engine.
//!
//! Supports type, universal, `#id`, `.class` and `[attr]` / `[attr=value]`
//! simple selectors, the descendant and child (`>`) combinators, and
//! comma-separated selector lists. Anything else is a parse error, which
//! target resolution treats as "no target".

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("selector is empty")]
    Empty,

    #[error("unexpected '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("expected a name at offset {0}")]
    ExpectedName(usize),

    #[error("unterminated attribute selector")]
    UnterminatedAttribute,

    #[error("unterminated string in attribute selector")]
    UnterminatedString,

    #[error("combinator without a following selector")]
    DanglingCombinator,
}

/// Read access to an element tree, addressed by node index
pub trait ElementTree {
    fn tag(&self, node: usize) -> &str;
    fn id(&self, node: usize) -> Option<&str>;
    fn has_class(&self, node: usize, class: &str) -> bool;
    fn attr(&self, node: usize, name: &str) -> Option<&str>;
    fn parent(&self, node: usize) -> Option<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Tag(String),
    Id(String),
    Class(String),
    Attr { name: String, value: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    parts: Vec<Simple>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[k]` joins `compounds[k]` and `compounds[k + 1]`
    combinators: Vec<Combinator>,
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser {
            chars: input.char_indices().collect(),
            pos: 0,
        };
        let mut alternatives = vec![parser.complex()?];
        while parser.eat(',') {
            alternatives.push(parser.complex()?);
        }
        parser.skip_ws();
        if let Some((offset, c)) = parser.peek_indexed() {
            return Err(SelectorError::UnexpectedChar(c, offset));
        }
        Ok(Self {
            source: input.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: usize) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches_at(tree, complex.compounds.len() - 1, node))
    }
}

impl Complex {
    fn matches_at<T: ElementTree + ?Sized>(&self, tree: &T, index: usize, node: usize) -> bool {
        if !self.compounds[index].matches(tree, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => tree
                .parent(node)
                .is_some_and(|parent| self.matches_at(tree, index - 1, parent)),
            Combinator::Descendant => {
                let mut ancestor = tree.parent(node);
                while let Some(candidate) = ancestor {
                    if self.matches_at(tree, index - 1, candidate) {
                        return true;
                    }
                    ancestor = tree.parent(candidate);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: usize) -> bool {
        self.parts.iter().all(|part| match part {
            Simple::Tag(tag) => tree.tag(node).eq_ignore_ascii_case(tag),
            Simple::Id(id) => tree.id(node) == Some(id.as_str()),
            Simple::Class(class) => tree.has_class(node, class),
            Simple::Attr { name, value: None } => tree.attr(node, name).is_some(),
            Simple::Attr {
                name,
                value: Some(expected),
            } => tree.attr(node, name) == Some(expected.as_str()),
        })
    }
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_indexed(&self) -> Option<(usize, char)> {
        self.chars.get(self.pos).copied()
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(offset, _)| offset)
            .unwrap_or_else(|| self.chars.last().map_or(0, |&(o, c)| o + c.len_utf8()))
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_ws();
        if self.peek().is_none() {
            return Err(SelectorError::Empty);
        }
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    Combinator::Child
                }
                Some(',') | None => break,
                Some(_) if had_ws => Combinator::Descendant,
                Some(c) => return Err(SelectorError::UnexpectedChar(c, self.offset())),
            };
            if matches!(self.peek(), None | Some(',')) {
                return Err(SelectorError::DanglingCombinator);
            }
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }

        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();

        match self.peek() {
            Some('*') => {
                self.pos += 1;
            }
            Some(c) if is_name_start(c) => {
                compound.parts.push(Simple::Tag(self.name()?));
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.parts.push(Simple::Id(self.name()?));
                }
                Some('.') => {
                    self.pos += 1;
                    compound.parts.push(Simple::Class(self.name()?));
                }
                Some('[') => {
                    self.pos += 1;
                    compound.parts.push(self.attribute()?);
                }
                _ => break,
            }
        }

        let universal = self
            .pos
            .checked_sub(1)
            .and_then(|p| self.chars.get(p))
            .is_some_and(|&(_, c)| c == '*');
        if compound.parts.is_empty() && !universal {
            return match self.peek_indexed() {
                Some((offset, c)) => Err(SelectorError::UnexpectedChar(c, offset)),
                None => Err(SelectorError::Empty),
            };
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<Simple, SelectorError> {
        self.skip_ws();
        let name = self.name()?;
        self.skip_ws();
        let value = match self.peek() {
            Some(']') => None,
            Some('=') => {
                self.pos += 1;
                self.skip_ws();
                Some(self.attribute_value()?)
            }
            Some(c) => return Err(SelectorError::UnexpectedChar(c, self.offset())),
            None => return Err(SelectorError::UnterminatedAttribute),
        };
        self.skip_ws();
        if self.peek() != Some(']') {
            return Err(SelectorError::UnterminatedAttribute);
        }
        self.pos += 1;
        Ok(Simple::Attr { name, value })
    }

    fn attribute_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        Some(c) if c == quote => {
                            self.pos += 1;
                            return Ok(value);
                        }
                        Some(c) => {
                            value.push(c);
                            self.pos += 1;
                        }
                        None => return Err(SelectorError::UnterminatedString),
                    }
                }
            }
            _ => self.name(),
        }
    }

    fn name(&mut self) -> Result<String, SelectorError> {
        let start = self.offset();
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if name.is_empty() || !name.starts_with(is_name_start) {
            return Err(SelectorError::ExpectedName(start));
        }
        Ok(name)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}
