//! Lexical analysis: turns the raw source text into a lazy token stream.
//!
//! The tokenizer knows nothing about the grammar beyond keywords, operators
//! and literals. Malformed input never fails here: it becomes a token of kind
//! `Error`, and the parser reports it once it tries to consume it.
//! Multi-character operators are matched before single-character ones.

/// Kinds of tokens recognised by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  Ident,
  Number,
  StringLiteral,

  Int,
  If,
  Else,
  While,
  Cout,
  Cin,
  Endl,

  Assign,
  ShiftLeft,
  ShiftRight,
  OrOr,
  AndAnd,
  Greater,
  Less,
  GreaterEq,
  LessEq,
  NotEq,
  EqEq,
  Plus,
  Minus,
  Star,
  Slash,
  Percent,
  Ampersand,

  LParen,
  RParen,
  LBrace,
  RBrace,
  LBracket,
  RBracket,
  Comma,
  Semicolon,

  Error,
  Eof,
}

impl TokenKind {
  /// Human-friendly name used in "expected ..." diagnostics.
  pub fn describe(self) -> &'static str {
    match self {
      TokenKind::Ident => "identifier",
      TokenKind::Number => "number",
      TokenKind::StringLiteral => "string literal",
      TokenKind::Int => "\"int\"",
      TokenKind::If => "\"if\"",
      TokenKind::Else => "\"else\"",
      TokenKind::While => "\"while\"",
      TokenKind::Cout => "\"cout\"",
      TokenKind::Cin => "\"cin\"",
      TokenKind::Endl => "\"endl\"",
      TokenKind::Assign => "\"=\"",
      TokenKind::ShiftLeft => "\"<<\"",
      TokenKind::ShiftRight => "\">>\"",
      TokenKind::OrOr => "\"||\"",
      TokenKind::AndAnd => "\"&&\"",
      TokenKind::Greater => "\">\"",
      TokenKind::Less => "\"<\"",
      TokenKind::GreaterEq => "\">=\"",
      TokenKind::LessEq => "\"<=\"",
      TokenKind::NotEq => "\"!=\"",
      TokenKind::EqEq => "\"==\"",
      TokenKind::Plus => "\"+\"",
      TokenKind::Minus => "\"-\"",
      TokenKind::Star => "\"*\"",
      TokenKind::Slash => "\"/\"",
      TokenKind::Percent => "\"%\"",
      TokenKind::Ampersand => "\"&\"",
      TokenKind::LParen => "\"(\"",
      TokenKind::RParen => "\")\"",
      TokenKind::LBrace => "\"{\"",
      TokenKind::RBrace => "\"}\"",
      TokenKind::LBracket => "\"[\"",
      TokenKind::RBracket => "\"]\"",
      TokenKind::Comma => "\",\"",
      TokenKind::Semicolon => "\";\"",
      TokenKind::Error => "invalid token",
      TokenKind::Eof => "end of input",
    }
  }

  fn keyword(word: &str) -> Option<TokenKind> {
    let kind = match word {
      "int" => TokenKind::Int,
      "if" => TokenKind::If,
      "else" => TokenKind::Else,
      "while" => TokenKind::While,
      "cout" => TokenKind::Cout,
      "cin" => TokenKind::Cin,
      "endl" => TokenKind::Endl,
      _ => return None,
    };
    Some(kind)
  }
}

/// A single lexeme together with its 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub line: u32,
  pub column: u32,
}

impl Token {
  /// Description of this concrete token for "but found ..." diagnostics.
  pub fn describe(&self) -> String {
    match self.kind {
      TokenKind::Eof => "end of input".to_string(),
      TokenKind::Ident => format!("identifier \"{}\"", self.text),
      TokenKind::Number => format!("number \"{}\"", self.text),
      TokenKind::StringLiteral => format!("string literal {}", self.text),
      _ => format!("\"{}\"", self.text),
    }
  }
}

const OPERATORS: [(&str, TokenKind); 25] = [
  ("<<", TokenKind::ShiftLeft),
  (">>", TokenKind::ShiftRight),
  ("||", TokenKind::OrOr),
  ("&&", TokenKind::AndAnd),
  ("<=", TokenKind::LessEq),
  (">=", TokenKind::GreaterEq),
  ("==", TokenKind::EqEq),
  ("!=", TokenKind::NotEq),
  ("=", TokenKind::Assign),
  ("<", TokenKind::Less),
  (">", TokenKind::Greater),
  ("+", TokenKind::Plus),
  ("-", TokenKind::Minus),
  ("*", TokenKind::Star),
  ("/", TokenKind::Slash),
  ("%", TokenKind::Percent),
  ("&", TokenKind::Ampersand),
  ("(", TokenKind::LParen),
  (")", TokenKind::RParen),
  ("{", TokenKind::LBrace),
  ("}", TokenKind::RBrace),
  ("[", TokenKind::LBracket),
  ("]", TokenKind::RBracket),
  (",", TokenKind::Comma),
  (";", TokenKind::Semicolon),
];

/// Lazy scanner over a source string. Yields exactly one `Eof` token at the
/// end and then stops.
pub struct Tokenizer<'a> {
  source: &'a str,
  pos: usize,
  line: u32,
  column: u32,
  done: bool,
}

impl<'a> Tokenizer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      source,
      pos: 0,
      line: 1,
      column: 1,
      done: false,
    }
  }

  fn rest(&self) -> &'a str {
    &self.source[self.pos..]
  }

  fn peek_char(&self) -> Option<char> {
    self.rest().chars().next()
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek_char()?;
    self.pos += c.len_utf8();
    if c == '\n' {
      self.line += 1;
      self.column = 1;
    } else {
      self.column += 1;
    }
    Some(c)
  }

  fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
    while self.peek_char().is_some_and(&pred) {
      self.bump();
    }
  }

  /// Skip whitespace and comments. An unterminated block comment swallows
  /// the rest of the input.
  fn skip_trivia(&mut self) {
    loop {
      let rest = self.rest();
      if rest.starts_with("//") {
        self.bump_while(|c| c != '\n');
      } else if rest.starts_with("/*") {
        self.bump();
        self.bump();
        while !self.rest().is_empty() && !self.rest().starts_with("*/") {
          self.bump();
        }
        self.bump();
        self.bump();
      } else if self.peek_char().is_some_and(char::is_whitespace) {
        self.bump_while(char::is_whitespace);
      } else {
        return;
      }
    }
  }

  /// Produce the next token, `Eof` once the input is exhausted.
  pub fn next_token(&mut self) -> Token {
    self.skip_trivia();

    let (line, column, start) = (self.line, self.column, self.pos);
    let make = |this: &Self, kind| Token {
      kind,
      text: this.source[start..this.pos].to_string(),
      line,
      column,
    };

    let Some(c) = self.peek_char() else {
      return make(&*self, TokenKind::Eof);
    };

    if c.is_ascii_alphabetic() || c == '_' {
      self.bump_while(|c| c.is_ascii_alphanumeric() || c == '_');
      let word = &self.source[start..self.pos];
      if word == "std" && self.rest().starts_with("::") {
        return self.qualified_name(start, line, column);
      }
      let kind = TokenKind::keyword(word).unwrap_or(TokenKind::Ident);
      return make(&*self, kind);
    }

    if c.is_ascii_digit() {
      self.bump_while(|c| c.is_ascii_digit());
      let mut fraction = self.rest().chars();
      if fraction.next() == Some('.') && fraction.next().is_some_and(|c| c.is_ascii_digit()) {
        self.bump();
        self.bump_while(|c| c.is_ascii_digit());
      }
      return make(&*self, TokenKind::Number);
    }

    if c == '"' {
      return self.string_literal(start, line, column);
    }

    if let Some((op, kind)) = OPERATORS
      .iter()
      .find(|(op, _)| self.rest().starts_with(op))
    {
      for _ in 0..op.len() {
        self.bump();
      }
      return make(&*self, *kind);
    }

    self.bump();
    make(&*self, TokenKind::Error)
  }

  /// `std::cout`, `std::cin` and `std::endl` spell the same keywords as their
  /// unqualified forms; any other qualified name is an error token.
  fn qualified_name(&mut self, start: usize, line: u32, column: u32) -> Token {
    self.bump();
    self.bump();
    let name_start = self.pos;
    self.bump_while(|c| c.is_ascii_alphanumeric() || c == '_');
    let kind = match TokenKind::keyword(&self.source[name_start..self.pos]) {
      Some(kind @ (TokenKind::Cout | TokenKind::Cin | TokenKind::Endl)) => kind,
      _ => TokenKind::Error,
    };
    Token {
      kind,
      text: self.source[start..self.pos].to_string(),
      line,
      column,
    }
  }

  /// Scan a double-quoted literal. The token text keeps its quotes and raw
  /// escape sequences; decoding happens at code generation.
  fn string_literal(&mut self, start: usize, line: u32, column: u32) -> Token {
    self.bump();
    let mut kind = TokenKind::Error;
    while let Some(c) = self.peek_char() {
      match c {
        '\n' => break,
        '\\' => {
          self.bump();
          self.bump();
        }
        '"' => {
          self.bump();
          kind = TokenKind::StringLiteral;
          break;
        }
        _ => {
          self.bump();
        }
      }
    }
    Token {
      kind,
      text: self.source[start..self.pos].to_string(),
      line,
      column,
    }
  }
}

impl Iterator for Tokenizer<'_> {
  type Item = Token;

  fn next(&mut self) -> Option<Token> {
    if self.done {
      return None;
    }
    let token = self.next_token();
    if token.kind == TokenKind::Eof {
      self.done = true;
    }
    Some(token)
  }
}

/// Convenience for callers that want the whole stream at once.
pub fn tokenize(source: &str) -> Vec<Token> {
  Tokenizer::new(source).collect()
}
