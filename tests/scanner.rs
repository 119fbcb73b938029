#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;
    use rlox::scanner::*;
    use rlox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn symbols_including_modulo_and_ternary() {
        assert_token_sequence(
            "({*.,+%?:})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::PERCENT, "%"),
                (TokenType::QUESTION, "?"),
                (TokenType::COLON, ":"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn keywords_added_for_traits_and_loops() {
        assert_token_sequence(
            "trait with break continue classy",
            &[
                (TokenType::TRAIT, "trait"),
                (TokenType::WITH, "with"),
                (TokenType::BREAK, "break"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn comments_are_skipped_and_lines_counted() {
        let tokens = Scanner::new("// nothing here\nvar x; // trailing\n\nx")
            .scan_all()
            .unwrap();

        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![2, 2, 2, 4, 4]);
    }

    #[test]
    fn literals_print_in_tokenize_format() {
        let tokens = Scanner::new("12 3.5 \"hi\"").scan_all().unwrap();
        let printed: Vec<String> = tokens.iter().map(Token::to_string).collect();

        assert_eq!(
            printed,
            vec![
                "NUMBER 12 12.0",
                "NUMBER 3.5 3.5",
                "STRING \"hi\" hi",
                "EOF  null"
            ]
        );
    }

    #[test]
    fn unexpected_characters_are_reported_and_scanning_continues() {
        let results: Vec<_> = Scanner::new(",.$(#").collect();

        assert_eq!(results.len(), 6);

        let kinds: Vec<Option<TokenType>> = results
            .iter()
            .map(|r| r.as_ref().ok().map(|t| t.token_type.clone()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                Some(TokenType::COMMA),
                Some(TokenType::DOT),
                None,
                Some(TokenType::LEFT_PAREN),
                None,
                Some(TokenType::EOF),
            ]
        );

        let messages: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err().map(ToString::to_string))
            .collect();
        assert_eq!(
            messages,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
            ]
        );
    }

    #[test]
    fn unterminated_string_fails_scan_all() {
        let err = Scanner::new("print \"open").scan_all().unwrap_err();

        assert_eq!(err.to_string(), "[line 1] Error: Unterminated string.");
    }

    #[test]
    fn tokens_serialize_to_json() {
        let tokens = Scanner::new("x").scan_all().unwrap();
        let json = serde_json::to_string(&tokens[0]).unwrap();

        assert!(json.contains("\"lexeme\":\"x\""), "{json}");
        assert!(json.contains("\"line\":1"), "{json}");
    }
}
