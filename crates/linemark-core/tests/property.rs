use std::panic;

use linemark_core::{Markdown, Options, convert};

const CASES: usize = 200;
const MAX_LEN: usize = 512;
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 \
\n\n\n\t#@*`~[](){}!<>:+-_=.|/\\\"'&";
const WIDE_CHARS: &[&str] = &["\u{e9}", "\u{2192}", "\u{1f600}"];
/// Inputs without `<` and `&` cannot carry raw HTML or unknown entities, so
/// safe-mode output must be well-formed XML.
const MARKUP_FREE: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789 \
\n\n\n\t#*`~[](){}!>:+-_=.|/\\\"'";

#[test]
fn convert_never_panics_on_random_input() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x7f4a_2d91_13b4_55a1);
    for case in 0..CASES {
        let len = rng.gen_range(0, MAX_LEN + 1);
        let source = random_string(&mut rng, CHARSET, len);
        let result = panic::catch_unwind(|| convert(&source));
        if result.is_err() {
            return Err(format!("convert panicked for case {}: {:?}", case, source).into());
        }
    }
    Ok(())
}

#[test]
fn every_option_combination_is_total() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x3c6e_f372_fe94_f82b);
    for case in 0..CASES {
        let bits = rng.gen_range(0, 16);
        let options = Options {
            line_breaks_on_newline: bits & 1 != 0,
            raw_html_escaped: bits & 2 != 0,
            bare_url_autolinking: bits & 4 != 0,
            safe_mode: bits & 8 != 0,
        };
        let len = rng.gen_range(0, MAX_LEN + 1);
        let source = random_string(&mut rng, CHARSET, len);
        let markdown = Markdown::with_options(options);
        let result = panic::catch_unwind(|| {
            markdown.convert(&source);
            markdown.render_inline(&source);
        });
        if result.is_err() {
            return Err(format!(
                "conversion panicked for case {} with {:?}: {:?}",
                case, options, source
            )
            .into());
        }
    }
    Ok(())
}

#[test]
fn safe_output_is_well_formed() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x91d4_2f8e_c1a3_044f);
    let markdown = Markdown::new().with_safe_mode(true);
    for case in 0..CASES {
        let len = rng.gen_range(0, MAX_LEN + 1);
        let source = random_string(&mut rng, MARKUP_FREE, len);
        let html = markdown.convert(&source);
        let wrapped = format!("<root>{}</root>", html);
        if let Err(error) = roxmltree::Document::parse(&wrapped) {
            return Err(format!(
                "malformed output for case {}: {}\nSource:\n---\n{}\n---\nOutput:\n---\n{}\n---",
                case, error, source, html
            )
            .into());
        }
    }
    Ok(())
}

fn random_string(rng: &mut Lcg, charset: &[u8], len: usize) -> String {
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        if rng.gen_range(0, 32) == 0 {
            out.push_str(WIDE_CHARS[rng.gen_range(0, WIDE_CHARS.len())]);
            continue;
        }
        let idx = rng.gen_range(0, charset.len());
        out.push(charset[idx] as char);
    }
    out
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn gen_range(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        let span = max - min;
        let value = (self.next() >> 1) as usize;
        min + (value % span)
    }
}
