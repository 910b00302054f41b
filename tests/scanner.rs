#[cfg(test)]
mod scanner_tests {
    use treelox as lox;

    use lox::error::LoxError;
    use lox::scanner::Scanner;
    use lox::token::TokenType;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_symbols() {
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
    fn test_scanner_one_or_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >= / -",
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
                (TokenType::MINUS, "-"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_comments_and_whitespace() {
        assert_token_sequence(
            "var x // the rest is ignored ===\n\t ;",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_keywords_and_identifiers() {
        assert_token_sequence(
            "class fun classy _under score99 while",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::FUN, "fun"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::IDENTIFIER, "_under"),
                (TokenType::IDENTIFIER, "score99"),
                (TokenType::WHILE, "while"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_number_literals() {
        let (tokens, errors) = Scanner::scan(b"12 3.5 4. .5");

        assert!(errors.is_empty());

        let numbers: Vec<f64> = tokens
            .iter()
            .filter_map(|t| match t.token_type {
                TokenType::NUMBER(n) => Some(n),
                _ => None,
            })
            .collect();

        // "4." scans as the number 4 followed by a dot; ".5" as a dot then 5.
        assert_eq!(numbers, vec![12.0, 3.5, 4.0, 5.0]);

        let dots = tokens
            .iter()
            .filter(|t| t.token_type == TokenType::DOT)
            .count();
        assert_eq!(dots, 2);
    }

    #[test]
    fn test_scanner_string_literal() {
        let (tokens, errors) = Scanner::scan(b"\"hi there\"");

        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);

        match &tokens[0].token_type {
            TokenType::STRING(contents) => assert_eq!(contents, "hi there"),
            other => panic!("Expected string token, got {:?}", other),
        }

        // The lexeme keeps the surrounding quotes.
        assert_eq!(tokens[0].lexeme, "\"hi there\"");
    }

    #[test]
    fn test_scanner_multiline_string_counts_lines() {
        let (tokens, errors) = Scanner::scan(b"\"one\ntwo\"\nx");

        assert!(errors.is_empty());

        // The string spans lines 1-2, so the identifier after it is on line 3.
        let ident = tokens
            .iter()
            .find(|t| t.token_type == TokenType::IDENTIFIER)
            .expect("identifier token");
        assert_eq!(ident.line, 3);
    }

    #[test]
    fn test_scanner_unterminated_string() {
        let (tokens, errors) = Scanner::scan(b"\"never closed");

        assert_eq!(errors.len(), 1);
        match &errors[0] {
            LoxError::Lex { message, line } => {
                assert_eq!(*line, 1);
                assert!(message.contains("Unterminated string"));
            }
            other => panic!("Expected lex error, got {:?}", other),
        }

        // The token list still terminates with EOF.
        assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
    }

    #[test]
    fn test_invalid_characters_report_their_lines() {
        let source = "var a = 1;\n$ # var b;\nprint a; @";

        let (tokens, errors) = Scanner::scan(source.as_bytes());

        // Scanning carries on past every bad character.
        assert_eq!(errors.len(), 3);

        let lines: Vec<usize> = errors
            .iter()
            .map(|e| match e {
                LoxError::Lex { line, .. } => *line,
                other => panic!("Expected lex error, got {:?}", other),
            })
            .collect();
        assert_eq!(lines, vec![2, 2, 3]);

        for (err, bad) in errors.iter().zip(["'$'", "'#'", "'@'"]) {
            let rendered = err.to_string();
            assert!(
                rendered.contains("Unexpected character") && rendered.contains(bad),
                "unexpected diagnostic: {}",
                rendered
            );
        }

        // The surrounding declarations still tokenize in full.
        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(
            lexemes,
            vec!["var", "a", "=", "1", ";", "var", "b", ";", "print", "a", ";", ""]
        );
    }

    #[test]
    fn test_scan_partitions_tokens_and_errors() {
        let (tokens, errors) = Scanner::scan(b"var @ x");

        assert_eq!(errors.len(), 1);
        assert_eq!(tokens.len(), 3); // var, x, EOF
    }

    #[test]
    fn test_lexemes_round_trip_modulo_whitespace() {
        let source = "var x = (1 + 2) * 3; // trailing comment";

        let (tokens, errors) = Scanner::scan(source.as_bytes());
        assert!(errors.is_empty());

        let joined: String = tokens.iter().map(|t| t.lexeme.as_str()).collect();

        let squeezed: String = source
            .split("//")
            .next()
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        assert_eq!(joined, squeezed);
    }

    #[test]
    fn test_eof_carries_final_line() {
        let (tokens, errors) = Scanner::scan(b"1\n2\n3");

        assert!(errors.is_empty());

        let eof = tokens.last().expect("eof token");
        assert_eq!(eof.token_type, TokenType::EOF);
        assert_eq!(eof.line, 3);
    }
}
