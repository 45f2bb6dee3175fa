use regex::Regex;

/// Pattern matches strings against a shell style glob where `*` matches any
/// run of characters and `?` matches exactly one.
#[derive(Debug, Clone)]
pub struct Pattern {
    re: Regex,
}

impl Pattern {
    pub fn new(glob: &str) -> Result<Self, regex::Error> {
        let mut expr = String::with_capacity(glob.len() + 8);
        expr.push('^');
        let mut buf = [0u8; 4];
        for c in glob.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                _ => expr.push_str(&regex::escape(c.encode_utf8(&mut buf))),
            }
        }
        expr.push('$');

        Ok(Self {
            re: Regex::new(&expr)?,
        })
    }

    pub fn matches(&self, s: &str) -> bool {
        self.re.is_match(s)
    }
}

#[cfg(test)]
mod tests {
    use crate::glob::Pattern;

    #[test]
    fn test_pattern() {
        let p = Pattern::new("WOPR:*").unwrap();
        assert!(p.matches("WOPR:PROD1"));
        assert!(!p.matches("WOPT:PROD1"));
        assert!(!p.matches("XWOPR:PROD1"));

        let p = Pattern::new("?OPT").unwrap();
        assert!(p.matches("FOPT"));
        assert!(p.matches("GOPT"));
        assert!(!p.matches("FOPTH"));

        let p = Pattern::new("BPR:1,2,?").unwrap();
        assert!(p.matches("BPR:1,2,3"));
        assert!(!p.matches("BPR:1.2,3"));

        assert!(Pattern::new("*").unwrap().matches(""));
    }
}
