#[cfg(test)]
mod scanner_tests {
    use scicalc::scanner::*;
    use scicalc::token::*;

    fn lexemes(source: &str) -> Vec<(TokenType, String)> {
        Scanner::new(source)
            .map(|t| (t.token_type.clone(), t.lexeme.to_string()))
            .collect()
    }

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let tokens = lexemes(source);

        assert_eq!(tokens.len(), expected.len(), "tokens: {:?}", tokens);

        for ((actual_type, actual_lexeme), (expected_type, expected_lexeme)) in
            tokens.iter().zip(expected.iter())
        {
            assert_eq!(actual_type, expected_type);
            assert_eq!(actual_lexeme, expected_lexeme);
        }
    }

    #[test]
    fn test_operators_longest_match() {
        assert_token_sequence(
            "a:=b<-c->d<=e<f",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::OPERATOR, ":="),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::OPERATOR, "<-"),
                (TokenType::IDENTIFIER, "c"),
                (TokenType::OPERATOR, "->"),
                (TokenType::IDENTIFIER, "d"),
                (TokenType::OPERATOR, "<="),
                (TokenType::IDENTIFIER, "e"),
                (TokenType::OPERATOR, "<"),
                (TokenType::IDENTIFIER, "f"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_punctuation_and_logic() {
        assert_token_sequence(
            "([x,y]);!a&&b||c!=d",
            &[
                (TokenType::OPERATOR, "("),
                (TokenType::OPERATOR, "["),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::OPERATOR, ","),
                (TokenType::IDENTIFIER, "y"),
                (TokenType::OPERATOR, "]"),
                (TokenType::OPERATOR, ")"),
                (TokenType::OPERATOR, ";"),
                (TokenType::OPERATOR, "!"),
                (TokenType::IDENTIFIER, "a"),
                (TokenType::OPERATOR, "&&"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::OPERATOR, "||"),
                (TokenType::IDENTIFIER, "c"),
                (TokenType::OPERATOR, "!="),
                (TokenType::IDENTIFIER, "d"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_reserved_words() {
        assert_token_sequence(
            "if x then elif_ else end div block $tmp",
            &[
                (TokenType::RESERVED, "if"),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::RESERVED, "then"),
                (TokenType::IDENTIFIER, "elif_"),
                (TokenType::RESERVED, "else"),
                (TokenType::RESERVED, "end"),
                (TokenType::RESERVED, "div"),
                (TokenType::RESERVED, "block"),
                (TokenType::IDENTIFIER, "$tmp"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_number_literals() {
        let values: Vec<f64> = Scanner::new("42 3.25 .5 1e3 2.5E-2 7e+1")
            .filter_map(|t| match t.token_type {
                TokenType::FLOAT(n) => Some(n),
                _ => None,
            })
            .collect();

        assert_eq!(values, vec![42.0, 3.25, 0.5, 1000.0, 0.025, 70.0]);
    }

    #[test]
    fn test_exponent_marker_without_digits_is_not_consumed() {
        assert_token_sequence(
            "1e",
            &[
                (TokenType::FLOAT(0.0), "1"),
                (TokenType::IDENTIFIER, "e"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_string_literal_with_escapes() {
        let mut scanner = Scanner::new(r#""a\tb\"c\\" rest"#);
        let token = scanner.next_token();

        match token.token_type {
            TokenType::STRING(s) => assert_eq!(s, "a\tb\"c\\"),
            other => panic!("Expected string, got {:?}", other),
        }

        assert_eq!(scanner.next_token().lexeme, "rest");
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_token_sequence(
            "1 // line comment\n/* block\n comment */ 2",
            &[
                (TokenType::FLOAT(0.0), "1"),
                (TokenType::FLOAT(0.0), "2"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_positions_track_lines_and_columns() {
        let tokens: Vec<Token> = Scanner::new("x\n  y /* \n */ z").collect();

        assert_eq!((tokens[0].line, tokens[0].col), (1, 0));
        assert_eq!((tokens[1].line, tokens[1].col), (2, 2));
        assert_eq!((tokens[2].line, tokens[2].col), (3, 4));
    }

    #[test]
    fn test_unterminated_block_comment_is_an_error_token() {
        let tokens: Vec<Token> = Scanner::new("1 /* never closed").collect();

        assert_eq!(tokens.len(), 3);
        match &tokens[1].token_type {
            TokenType::ERROR(message) => assert!(message.contains("Unterminated block comment")),
            other => panic!("Expected error token, got {:?}", other),
        }
        assert_eq!(tokens[2].token_type, TokenType::EOF);
    }

    #[test]
    fn test_unterminated_string_is_an_error_token() {
        let tokens: Vec<Token> = Scanner::new("\"abc").collect();

        assert!(matches!(&tokens[0].token_type, TokenType::ERROR(m) if m == "Unterminated string"));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let tokens: Vec<Token> = Scanner::new(",=(#é").collect();

        // 0: ',' 1: error '=' 2: '(' 3: error '#' 4: error 'é' 5: EOF
        assert_eq!(tokens.len(), 6);

        let errors: Vec<&Token> = tokens
            .iter()
            .filter(|t| matches!(t.token_type, TokenType::ERROR(_)))
            .collect();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].col, 1);
        assert_eq!(errors[1].col, 3);
        assert_eq!(errors[2].lexeme, "é");

        for err in errors {
            match &err.token_type {
                TokenType::ERROR(message) => assert!(
                    message.contains("Unexpected character"),
                    "Error message should mention the character, got: {}",
                    message
                ),
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn test_eof_is_emitted_once() {
        let mut scanner = Scanner::new("x");

        assert!(scanner.next().is_some());
        assert_eq!(scanner.next().map(|t| t.token_type), Some(TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_show_location_places_caret() {
        let src = "first\n\tx := @";

        assert_eq!(show_location(src, 2, 6), "\tx := @\n\t     ^");
        assert_eq!(show_location(src, 1, 0), "first\n^");
        assert_eq!(show_location(src, 5, 0), "at end of input");
    }

    #[test]
    fn test_token_display() {
        let tokens: Vec<String> = Scanner::new("3 2.5 foo").map(|t| t.to_string()).collect();

        assert_eq!(
            tokens,
            vec![
                "FLOAT 3 3.0".to_string(),
                "FLOAT 2.5 2.5".to_string(),
                "IDENTIFIER foo null".to_string(),
                "EOF  null".to_string(),
            ]
        );
    }
}
