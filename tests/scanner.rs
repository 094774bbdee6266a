#[cfg(test)]
mod scanner_tests {
    use rox::error::DiagnosticKind;
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let (tokens, diagnostics) = Scanner::new(source).scan_tokens();

        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        assert_eq!(tokens.len(), expected.len(), "tokens: {:?}", tokens);

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >= /",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_newline_is_a_terminator() {
        assert_token_sequence(
            "print 1\nprint 2",
            &[
                (TokenType::PRINT, "print"),
                (TokenType::NUMBER, "1"),
                (TokenType::SEMICOLON, "\n"),
                (TokenType::PRINT, "print"),
                (TokenType::NUMBER, "2"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comment_keeps_its_newline() {
        assert_token_sequence(
            "var a // trailing words\n;",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "a"),
                (TokenType::SEMICOLON, "\n"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_keywords_and_identifiers() {
        assert_token_sequence(
            "and class else false for fun if nil or print return super this true var while _x1 classy",
            &[
                (TokenType::AND, "and"),
                (TokenType::CLASS, "class"),
                (TokenType::ELSE, "else"),
                (TokenType::FALSE, "false"),
                (TokenType::FOR, "for"),
                (TokenType::FUN, "fun"),
                (TokenType::IF, "if"),
                (TokenType::NIL, "nil"),
                (TokenType::OR, "or"),
                (TokenType::PRINT, "print"),
                (TokenType::RETURN, "return"),
                (TokenType::SUPER, "super"),
                (TokenType::THIS, "this"),
                (TokenType::TRUE, "true"),
                (TokenType::VAR, "var"),
                (TokenType::WHILE, "while"),
                (TokenType::IDENTIFIER, "_x1"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_06_literals() {
        let (tokens, diagnostics) = Scanner::new("12.5 7 \"hi there\"").scan_tokens();

        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].literal, Some(Literal::Number(12.5)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(7.0)));
        assert_eq!(tokens[2].literal, Some(Literal::Str("hi there".to_string())));
        assert_eq!(tokens[2].lexeme, "\"hi there\"");
    }

    #[test]
    fn test_scanner_07_trailing_dot_is_not_a_fraction() {
        assert_token_sequence(
            "12.",
            &[
                (TokenType::NUMBER, "12"),
                (TokenType::DOT, "."),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_08_line_numbers() {
        let (tokens, _) = Scanner::new("a\n\"x\ny\"\nb").scan_tokens();

        let lines: Vec<(TokenType, usize)> =
            tokens.iter().map(|t| (t.token_type, t.line)).collect();

        assert_eq!(
            lines,
            vec![
                (TokenType::IDENTIFIER, 1),
                (TokenType::SEMICOLON, 2),
                (TokenType::STRING, 3),
                (TokenType::SEMICOLON, 4),
                (TokenType::IDENTIFIER, 4),
                (TokenType::EOF, 4),
            ]
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source).collect();

        // COMMA, DOT, error, LEFT_PAREN, error, EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(errors.len(), 2, "Expected 2 error messages");

        for err in errors {
            assert_eq!(err.kind, DiagnosticKind::Lexical);
            assert_eq!(err.to_string(), "[line 1] Error: Unexpected character.");
        }
    }

    #[test]
    fn test_multibyte_unexpected_character_is_skipped_whole() {
        let (tokens, diagnostics) = Scanner::new("a é b").scan_tokens();

        assert_eq!(diagnostics.len(), 1);
        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["a", "b", ""]);
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, diagnostics) = Scanner::new("print \"oops\nmore").scan_tokens();

        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().expect("one diagnostic");
        assert_eq!(diagnostic.to_string(), "[line 2] Error: Unterminated string.");

        assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::EOF));
    }

    #[test]
    fn test_exactly_one_eof_and_fused() {
        let mut scanner = Scanner::new("");
        assert_token_matches(
            &scanner.next().expect("eof token"),
            TokenType::EOF,
            "",
        );
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_token_display() {
        let (tokens, _) = Scanner::new("var x = 3\n\"s\" 2.5").scan_tokens();
        let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        assert_eq!(
            rendered,
            vec![
                "VAR var null",
                "IDENTIFIER x null",
                "EQUAL = null",
                "NUMBER 3 3.0",
                "SEMICOLON \\n null",
                "STRING \"s\" s",
                "NUMBER 2.5 2.5",
                "EOF  null",
            ]
        );
    }

    fn assert_token_matches(
        result: &Result<Token, rox::error::Diagnostic>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        match result {
            Ok(token) => {
                assert_eq!(token.token_type, expected_type);
                assert_eq!(token.lexeme, expected_lexeme);
            }
            Err(e) => panic!("Expected token, got error: {}", e),
        }
    }
}
