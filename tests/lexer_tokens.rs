use codingdb::odb::{Lexer, TokenKind};

fn scan(src: &str) -> Vec<(usize, usize, TokenKind)> {
    let mut lexer = Lexer::new(src.as_bytes());
    let mut out = Vec::new();
    loop {
        let token = lexer.next_token().unwrap();
        if token.kind == TokenKind::Eof {
            return out;
        }
        out.push((token.line, token.col, token.kind));
    }
}

#[test]
fn positions_survive_comments_and_line_ends() {
    let src = "; header comment\r\n( ONSET> 120 ) ; trailing\n  ( |<val>| \"two\nlines\" )\n";
    assert_eq!(
        scan(src),
        vec![
            (2, 1, TokenKind::LParen),
            (2, 3, TokenKind::Label("ONSET>".into())),
            (2, 10, TokenKind::Int(120)),
            (2, 14, TokenKind::RParen),
            (3, 3, TokenKind::LParen),
            (3, 5, TokenKind::Symbol("<val>".into())),
            (3, 13, TokenKind::String("two\nlines".into())),
            (4, 8, TokenKind::RParen),
        ]
    );
}

#[test]
fn control_characters_are_reported_not_fatal() {
    let kinds: Vec<TokenKind> = scan("(\u{1} 3)").into_iter().map(|(.., k)| k).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::LParen,
            TokenKind::Error("illegal character 0x01".into()),
            TokenKind::Int(3),
            TokenKind::RParen,
        ]
    );
}

#[test]
fn strings_drop_non_printing_characters_with_a_warning() {
    let mut lexer = Lexer::new("\"a\u{7}b\"".as_bytes());
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::String("ab".into()));
    let warnings = lexer.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!((warnings[0].line, warnings[0].col), (1, 1));
}

#[test]
fn escaped_control_characters_are_kept() {
    let mut lexer = Lexer::new("\"a\\\u{1}b\"".as_bytes());
    assert_eq!(
        lexer.next_token().unwrap().kind,
        TokenKind::String("a\u{1}b".into())
    );
    assert!(lexer.take_warnings().is_empty());
}
