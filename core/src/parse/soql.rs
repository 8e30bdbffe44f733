//! Tokenizer and recursive-descent parser for candidate SOQL strings.
//!
//! The parser is deliberately forgiving about formatting (keywords are
//! case-insensitive, whitespace is free-form) but strict about structure:
//! anything it cannot shape into a [`ParsedQueryAst`] is a parse error the
//! validator reports verbatim.

use super::ast::{
    AggregateCall, CompareOp, Comparison, OrderBy, ParentLookup, ParsedQueryAst, SoqlValue,
    Subquery, WhereExpr,
};
use super::ParseError;

/// SOQL date literals that may appear unquoted in value position.
pub const DATE_LITERALS: [&str; 18] = [
    "TODAY",
    "YESTERDAY",
    "TOMORROW",
    "THIS_WEEK",
    "LAST_WEEK",
    "NEXT_WEEK",
    "THIS_MONTH",
    "LAST_MONTH",
    "NEXT_MONTH",
    "THIS_QUARTER",
    "LAST_QUARTER",
    "NEXT_QUARTER",
    "THIS_YEAR",
    "LAST_YEAR",
    "NEXT_YEAR",
    "LAST_N_DAYS",
    "NEXT_N_DAYS",
    "LAST_N_MONTHS",
];

/// Aggregate functions recognised in the select list.
const AGGREGATE_FUNCTIONS: [&str; 6] = ["COUNT", "COUNT_DISTINCT", "SUM", "AVG", "MIN", "MAX"];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    /// An unquoted date or datetime literal (`2024-01-31`,
    /// `2024-01-31T00:00:00Z`)
    DateLike(String),
    Comma,
    Dot,
    Colon,
    LParen,
    RParen,
    Op(&'static str),
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    position: usize,
}

fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            ',' => {
                tokens.push(Spanned { token: Token::Comma, position: i });
                i += 1;
            }
            '.' => {
                tokens.push(Spanned { token: Token::Dot, position: i });
                i += 1;
            }
            ':' => {
                tokens.push(Spanned { token: Token::Colon, position: i });
                i += 1;
            }
            '(' => {
                tokens.push(Spanned { token: Token::LParen, position: i });
                i += 1;
            }
            ')' => {
                tokens.push(Spanned { token: Token::RParen, position: i });
                i += 1;
            }
            '=' => {
                tokens.push(Spanned { token: Token::Op("="), position: i });
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Spanned { token: Token::Op("!="), position: i });
                i += 2;
            }
            '<' => {
                let (op, len) = match chars.get(i + 1) {
                    Some('>') => ("<>", 2),
                    Some('=') => ("<=", 2),
                    _ => ("<", 1),
                };
                tokens.push(Spanned { token: Token::Op(op), position: i });
                i += len;
            }
            '>' => {
                let (op, len) = match chars.get(i + 1) {
                    Some('=') => (">=", 2),
                    _ => (">", 1),
                };
                tokens.push(Spanned { token: Token::Op(op), position: i });
                i += len;
            }
            '\'' => {
                let start = i;
                i += 1;
                let mut value = String::new();
                let mut closed = false;
                while i < chars.len() {
                    match chars[i] {
                        '\\' if i + 1 < chars.len() => {
                            value.push(chars[i + 1]);
                            i += 2;
                        }
                        '\'' => {
                            closed = true;
                            i += 1;
                            break;
                        }
                        other => {
                            value.push(other);
                            i += 1;
                        }
                    }
                }
                if !closed {
                    return Err(ParseError::UnterminatedString { position: start });
                }
                tokens.push(Spanned { token: Token::Str(value), position: start });
            }
            c if c.is_ascii_digit() => {
                let start = i;
                let mut word = String::new();
                // Dates and datetimes appear unquoted in SOQL, so a
                // digit-led token may contain -, :, T, Z and +.
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric()
                        || matches!(chars[i], '.' | '-' | ':' | '+'))
                {
                    word.push(chars[i]);
                    i += 1;
                }
                if let Ok(n) = word.parse::<f64>() {
                    tokens.push(Spanned { token: Token::Number(n), position: start });
                } else if looks_like_date(&word) {
                    tokens.push(Spanned { token: Token::DateLike(word), position: start });
                } else {
                    return Err(ParseError::InvalidNumber { literal: word });
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                let mut word = String::new();
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    word.push(chars[i]);
                    i += 1;
                }
                tokens.push(Spanned { token: Token::Ident(word), position: start });
            }
            other => {
                return Err(ParseError::UnexpectedToken {
                    found: other.to_string(),
                    position: i,
                    expected: "a SOQL token".to_string(),
                });
            }
        }
    }

    Ok(tokens)
}

fn looks_like_date(word: &str) -> bool {
    let bytes = word.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn next(&mut self) -> Option<Spanned> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    /// True if the next token is the given keyword (case-insensitive).
    fn at_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w.eq_ignore_ascii_case(kw))
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), ParseError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.unexpected(kw))
        }
    }

    fn expect_token(&mut self, token: Token, expected: &str) -> Result<(), ParseError> {
        match self.next() {
            Some(s) if s.token == token => Ok(()),
            Some(s) => Err(ParseError::UnexpectedToken {
                found: describe(&s.token),
                position: s.position,
                expected: expected.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof { expected: expected.to_string() }),
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.next() {
            Some(Spanned { token: Token::Ident(w), .. }) => Ok(w),
            Some(s) => Err(ParseError::UnexpectedToken {
                found: describe(&s.token),
                position: s.position,
                expected: expected.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof { expected: expected.to_string() }),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(s) => ParseError::UnexpectedToken {
                found: describe(&s.token),
                position: s.position,
                expected: expected.to_string(),
            },
            None => ParseError::UnexpectedEof { expected: expected.to_string() },
        }
    }

    /// `Ident (. Ident)*`
    fn parse_path(&mut self) -> Result<String, ParseError> {
        let mut path = self.expect_ident("a field or relationship name")?;
        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            let segment = self.expect_ident("a path segment after '.'")?;
            path.push('.');
            path.push_str(&segment);
        }
        Ok(path)
    }

    fn parse_number_u64(&mut self, clause: &str) -> Result<u64, ParseError> {
        match self.next() {
            Some(Spanned { token: Token::Number(n), .. }) if n >= 0.0 && n.fract() == 0.0 => {
                Ok(n as u64)
            }
            Some(s) => Err(ParseError::UnexpectedToken {
                found: describe(&s.token),
                position: s.position,
                expected: format!("an integer after {clause}"),
            }),
            None => Err(ParseError::UnexpectedEof {
                expected: format!("an integer after {clause}"),
            }),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(w) => w.clone(),
        Token::Number(n) => n.to_string(),
        Token::Str(s) => format!("'{s}'"),
        Token::DateLike(d) => d.clone(),
        Token::Comma => ",".to_string(),
        Token::Dot => ".".to_string(),
        Token::Colon => ":".to_string(),
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::Op(op) => (*op).to_string(),
    }
}

/// Parse a candidate SOQL string into an AST.
pub fn parse_soql(input: &str) -> Result<ParsedQueryAst, ParseError> {
    let tokens = tokenize(input)?;
    let mut p = Parser { tokens, pos: 0 };

    p.expect_keyword("SELECT")?;

    let mut fields = Vec::new();
    let mut aggregates = Vec::new();
    let mut subqueries = Vec::new();

    loop {
        if p.peek() == Some(&Token::LParen) {
            subqueries.push(parse_subquery(&mut p)?);
        } else {
            parse_select_item(&mut p, &mut fields, &mut aggregates)?;
        }
        if p.peek() == Some(&Token::Comma) {
            p.pos += 1;
            continue;
        }
        break;
    }

    p.expect_keyword("FROM")?;
    let main_object = p.expect_ident("an object name after FROM")?;

    let where_clause = if p.eat_keyword("WHERE") {
        Some(parse_or_expr(&mut p)?)
    } else {
        None
    };

    let mut group_by = Vec::new();
    if p.eat_keyword("GROUP") {
        p.expect_keyword("BY")?;
        group_by.push(p.parse_path()?);
        while p.peek() == Some(&Token::Comma) {
            p.pos += 1;
            group_by.push(p.parse_path()?);
        }
    }

    let mut order_by = Vec::new();
    if p.eat_keyword("ORDER") {
        p.expect_keyword("BY")?;
        loop {
            let field_path = p.parse_path()?;
            let descending = if p.eat_keyword("DESC") {
                true
            } else {
                p.eat_keyword("ASC");
                false
            };
            // NULLS FIRST / NULLS LAST is accepted and dropped.
            if p.eat_keyword("NULLS") {
                if !p.eat_keyword("FIRST") {
                    p.expect_keyword("LAST")?;
                }
            }
            order_by.push(OrderBy { field_path, descending });
            if p.peek() == Some(&Token::Comma) {
                p.pos += 1;
                continue;
            }
            break;
        }
    }

    let limit = if p.eat_keyword("LIMIT") {
        Some(p.parse_number_u64("LIMIT")?)
    } else {
        None
    };

    let offset = if p.eat_keyword("OFFSET") {
        Some(p.parse_number_u64("OFFSET")?)
    } else {
        None
    };

    if p.peek().is_some() {
        return Err(p.unexpected("end of query"));
    }

    let parent_lookups = fields
        .iter()
        .filter(|f| f.contains('.'))
        .map(|raw| {
            let mut segments: Vec<String> = raw.split('.').map(|s| s.to_string()).collect();
            let target_field = segments.pop().unwrap_or_default();
            ParentLookup {
                path: segments,
                target_field,
                raw: raw.clone(),
            }
        })
        .collect();

    Ok(ParsedQueryAst {
        main_object,
        fields,
        aggregates,
        group_by,
        where_clause,
        parent_lookups,
        subqueries,
        order_by,
        limit,
        offset,
    })
}

fn parse_select_item(
    p: &mut Parser,
    fields: &mut Vec<String>,
    aggregates: &mut Vec<AggregateCall>,
) -> Result<(), ParseError> {
    let first = p.expect_ident("a field or aggregate")?;

    if p.peek() == Some(&Token::LParen)
        && AGGREGATE_FUNCTIONS
            .iter()
            .any(|f| first.eq_ignore_ascii_case(f))
    {
        p.pos += 1;
        let argument = if p.peek() == Some(&Token::RParen) {
            None
        } else {
            Some(p.parse_path()?)
        };
        p.expect_token(Token::RParen, "')' closing the aggregate call")?;

        // An optional alias follows, as long as it is not a clause keyword.
        let alias = match p.peek() {
            Some(Token::Ident(w)) if !is_clause_keyword(w) => Some(p.expect_ident("alias")?),
            _ => None,
        };

        aggregates.push(AggregateCall {
            function: first.to_ascii_uppercase(),
            argument,
            alias,
        });
        return Ok(());
    }

    // Plain, possibly dotted field path.
    let mut path = first;
    while p.peek() == Some(&Token::Dot) {
        p.pos += 1;
        let segment = p.expect_ident("a path segment after '.'")?;
        path.push('.');
        path.push_str(&segment);
    }
    fields.push(path);
    Ok(())
}

fn is_clause_keyword(word: &str) -> bool {
    ["FROM", "WHERE", "GROUP", "ORDER", "LIMIT", "OFFSET"]
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
}

fn parse_subquery(p: &mut Parser) -> Result<Subquery, ParseError> {
    p.expect_token(Token::LParen, "'(' opening a subquery")?;
    p.expect_keyword("SELECT")?;

    let mut fields = vec![p.parse_path()?];
    while p.peek() == Some(&Token::Comma) {
        p.pos += 1;
        fields.push(p.parse_path()?);
    }

    p.expect_keyword("FROM")?;
    let relationship_name = p.expect_ident("a child relationship name")?;

    // Inner WHERE / ORDER BY / LIMIT are parsed for well-formedness but not
    // retained; the validator only reasons about the relationship and its
    // field list.
    if p.eat_keyword("WHERE") {
        parse_or_expr(p)?;
    }
    if p.eat_keyword("ORDER") {
        p.expect_keyword("BY")?;
        p.parse_path()?;
        if !p.eat_keyword("DESC") {
            p.eat_keyword("ASC");
        }
    }
    if p.eat_keyword("LIMIT") {
        p.parse_number_u64("LIMIT")?;
    }

    p.expect_token(Token::RParen, "')' closing the subquery")?;
    Ok(Subquery {
        relationship_name,
        fields,
    })
}

fn parse_or_expr(p: &mut Parser) -> Result<WhereExpr, ParseError> {
    let mut children = vec![parse_and_expr(p)?];
    while p.eat_keyword("OR") {
        children.push(parse_and_expr(p)?);
    }
    Ok(if children.len() == 1 {
        children.pop().unwrap()
    } else {
        WhereExpr::Or(children)
    })
}

fn parse_and_expr(p: &mut Parser) -> Result<WhereExpr, ParseError> {
    let mut children = vec![parse_where_primary(p)?];
    while p.eat_keyword("AND") {
        children.push(parse_where_primary(p)?);
    }
    Ok(if children.len() == 1 {
        children.pop().unwrap()
    } else {
        WhereExpr::And(children)
    })
}

fn parse_where_primary(p: &mut Parser) -> Result<WhereExpr, ParseError> {
    if p.eat_keyword("NOT") {
        return Ok(WhereExpr::Not(Box::new(parse_where_primary(p)?)));
    }
    if p.peek() == Some(&Token::LParen) {
        p.pos += 1;
        let inner = parse_or_expr(p)?;
        p.expect_token(Token::RParen, "')' closing the group")?;
        return Ok(inner);
    }
    parse_comparison(p).map(WhereExpr::Cmp)
}

fn parse_comparison(p: &mut Parser) -> Result<Comparison, ParseError> {
    let field_path = p.parse_path()?;

    let op = if p.eat_keyword("LIKE") {
        CompareOp::Like
    } else if p.eat_keyword("NOT") {
        p.expect_keyword("IN")?;
        CompareOp::NotIn
    } else if p.eat_keyword("IN") {
        CompareOp::In
    } else if p.eat_keyword("INCLUDES") {
        CompareOp::Includes
    } else if p.eat_keyword("EXCLUDES") {
        CompareOp::Excludes
    } else {
        match p.next() {
            Some(Spanned { token: Token::Op(op), .. }) => match op {
                "=" => CompareOp::Eq,
                "!=" | "<>" => CompareOp::Neq,
                "<" => CompareOp::Lt,
                ">" => CompareOp::Gt,
                "<=" => CompareOp::Le,
                ">=" => CompareOp::Ge,
                _ => unreachable!("tokenizer only emits known operators"),
            },
            Some(s) => {
                return Err(ParseError::UnexpectedToken {
                    found: describe(&s.token),
                    position: s.position,
                    expected: "a comparison operator".to_string(),
                })
            }
            None => {
                return Err(ParseError::UnexpectedEof {
                    expected: "a comparison operator".to_string(),
                })
            }
        }
    };

    let value = match op {
        CompareOp::In | CompareOp::NotIn | CompareOp::Includes | CompareOp::Excludes => {
            p.expect_token(Token::LParen, "'(' opening the value list")?;
            let mut values = vec![parse_value(p)?];
            while p.peek() == Some(&Token::Comma) {
                p.pos += 1;
                values.push(parse_value(p)?);
            }
            p.expect_token(Token::RParen, "')' closing the value list")?;
            SoqlValue::List(values)
        }
        _ => parse_value(p)?,
    };

    Ok(Comparison { field_path, op, value })
}

fn parse_value(p: &mut Parser) -> Result<SoqlValue, ParseError> {
    match p.next() {
        Some(Spanned { token: Token::Str(s), .. }) => Ok(SoqlValue::Str(s)),
        Some(Spanned { token: Token::Number(n), .. }) => Ok(SoqlValue::Number(n)),
        Some(Spanned { token: Token::DateLike(d), .. }) => Ok(SoqlValue::DateLiteral(d)),
        Some(Spanned { token: Token::Ident(w), position }) => {
            if w.eq_ignore_ascii_case("TRUE") {
                Ok(SoqlValue::Bool(true))
            } else if w.eq_ignore_ascii_case("FALSE") {
                Ok(SoqlValue::Bool(false))
            } else if w.eq_ignore_ascii_case("NULL") {
                Ok(SoqlValue::Null)
            } else if DATE_LITERALS.iter().any(|d| w.eq_ignore_ascii_case(d)) {
                let mut literal = w.to_ascii_uppercase();
                // Parameterised forms: LAST_N_DAYS:30
                if p.peek() == Some(&Token::Colon) {
                    p.pos += 1;
                    let n = p.parse_number_u64("the date literal parameter")?;
                    literal.push(':');
                    literal.push_str(&n.to_string());
                }
                Ok(SoqlValue::DateLiteral(literal))
            } else {
                Err(ParseError::UnexpectedToken {
                    found: w,
                    position,
                    expected: "a literal value".to_string(),
                })
            }
        }
        Some(s) => Err(ParseError::UnexpectedToken {
            found: describe(&s.token),
            position: s.position,
            expected: "a literal value".to_string(),
        }),
        None => Err(ParseError::UnexpectedEof {
            expected: "a literal value".to_string(),
        }),
    }
}
