//! Parses one line of the table command language.
//!
//! Keywords (`CREATE`, `TABLE`, `INSERT`, `INTO`, `KEY`, ...) are matched
//! case-insensitively; table names are taken verbatim and are therefore
//! case-sensitive.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { table: String },
    Insert { table: String, key: i32 },
    Erase { table: String, key: i32 },
    Query { table: String, key: i32 },
    Destroy { table: String },
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError;

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid operation. please check and input again.")
    }
}

impl std::error::Error for ParseError {}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut tokens = line.split_whitespace();
        let op = tokens.next().ok_or(ParseError)?;

        match op.to_ascii_lowercase().as_str() {
            "exit" => Ok(Command::Exit),
            "create" => {
                expect_keyword(&mut tokens, "table")?;
                let table = tokens.next().ok_or(ParseError)?.to_string();
                Ok(Command::Create { table })
            }
            "insert" => {
                expect_keyword(&mut tokens, "into")?;
                let table = tokens.next().ok_or(ParseError)?.to_string();
                expect_keyword(&mut tokens, "key")?;
                let key = parse_int(tokens.next().ok_or(ParseError)?)?;
                Ok(Command::Insert { table, key })
            }
            "erase" => {
                expect_keyword(&mut tokens, "from")?;
                let table = tokens.next().ok_or(ParseError)?.to_string();
                expect_keyword(&mut tokens, "key")?;
                let key = parse_int(tokens.next().ok_or(ParseError)?)?;
                Ok(Command::Erase { table, key })
            }
            "query" => {
                expect_keyword(&mut tokens, "from")?;
                let table = tokens.next().ok_or(ParseError)?.to_string();
                expect_keyword(&mut tokens, "key")?;
                let key = parse_int(tokens.next().ok_or(ParseError)?)?;
                Ok(Command::Query { table, key })
            }
            "destroy" => {
                expect_keyword(&mut tokens, "table")?;
                let table = tokens.next().ok_or(ParseError)?.to_string();
                Ok(Command::Destroy { table })
            }
            _ => Err(ParseError),
        }
    }
}

fn expect_keyword<'a>(tokens: &mut impl Iterator<Item = &'a str>, keyword: &str) -> Result<(), ParseError> {
    let token = tokens.next().ok_or(ParseError)?;
    if token.eq_ignore_ascii_case(keyword) {
        Ok(())
    } else {
        Err(ParseError)
    }
}

fn parse_int(token: &str) -> Result<i32, ParseError> {
    token.parse().map_err(|_| ParseError)
}
