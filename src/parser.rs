use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{BlockBody, EventBlock, HttpBlock, MainConfig};
use crate::error::{Error, ErrorKind, Result};
use crate::tokenizer::{Token, Tokenizer};
use crate::uri::UriParser;

/// Top-level directives.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Directive {
    Env,
    WorkerProcesses,
    Daemon,
    TimerResolution,
    ErrorLog,
    Http,
    Events,
}

const NUM_DIRECTIVES: usize = 7;

impl Directive {
    pub const ALL: [Directive; NUM_DIRECTIVES] = [
        Directive::Env,
        Directive::WorkerProcesses,
        Directive::Daemon,
        Directive::TimerResolution,
        Directive::ErrorLog,
        Directive::Http,
        Directive::Events,
    ];

    pub fn from_name(name: &str) -> Option<Directive> {
        Directive::ALL.iter().copied().find(|d| d.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Directive::Env => "env",
            Directive::WorkerProcesses => "worker_processes",
            Directive::Daemon => "daemon",
            Directive::TimerResolution => "timer_resolution",
            Directive::ErrorLog => "error_log",
            Directive::Http => "http",
            Directive::Events => "events",
        }
    }

    // Number of arguments the directive takes.
    fn arity(&self) -> usize {
        match *self {
            Directive::Http | Directive::Events => 0,
            _ => 1,
        }
    }
}

/// The set of directives seen so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveSet {
    seen: [bool; NUM_DIRECTIVES],
}

impl DirectiveSet {
    pub fn contains(&self, d: Directive) -> bool {
        self.seen[d as usize]
    }

    /// Returns false if `d` was already in the set.
    pub fn insert(&mut self, d: Directive) -> bool {
        let was_seen = self.seen[d as usize];
        self.seen[d as usize] = true;
        !was_seen
    }

    pub fn iter(&self) -> impl Iterator<Item = Directive> + '_ {
        Directive::ALL.iter().copied().filter(move |d| self.contains(*d))
    }
}

pub(crate) struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    config: MainConfig,
}

impl<'a> Parser<'a> {
    pub fn from_str(data: &'a str) -> Parser<'a> {
        Parser {
            tokenizer: Tokenizer::from_str(data),
            config: MainConfig::default(),
        }
    }

    /// Parse the whole buffer. The first error aborts the parse.
    pub fn parse(mut self) -> Result<MainConfig> {
        loop {
            self.tokenizer.skip_space();
            if self.tokenizer.is_eof() {
                break;
            }
            if self.tokenizer.at_terminator() {
                // empty line or comment.
                self.tokenizer.skip_line();
                continue;
            }
            self.directive()?;
            self.tokenizer.skip_line();
        }
        debug!("parse: done, seen {:?}", self.config.seen.iter().collect::<Vec<_>>());
        Ok(self.config)
    }

    fn directive(&mut self) -> Result<()> {
        let name = self.tokenizer.parse_name();
        let directive = self.lookup(&name)?;
        let args = self.arguments(directive)?;
        debug!("directive {} {:?}", directive.as_str(), args);

        let arity = directive.arity();
        if args.len() != arity {
            let offender = args.get(arity).unwrap_or(&name);
            return Err(Error::new(
                ErrorKind::InvalidArgumentCount,
                &offender.value,
                offender.pos,
                format!("invalid number of arguments for \"{}\".", directive.as_str()),
            ));
        }

        match directive {
            Directive::Env => self.env(&args[0]),
            Directive::WorkerProcesses => self.worker_processes(&args[0]),
            Directive::Daemon => self.daemon(&args[0]),
            Directive::TimerResolution => self.timer_resolution(&args[0]),
            Directive::ErrorLog => self.error_log(&args[0]),
            Directive::Http => {
                self.config.http = Some(self.block::<HttpBlock>()?);
                Ok(())
            }
            Directive::Events => {
                self.config.events = Some(self.block::<EventBlock>()?);
                Ok(())
            }
        }
    }

    fn lookup(&mut self, name: &Token) -> Result<Directive> {
        if name.value.is_empty() {
            let token = self.tokenizer.unexpected();
            return Err(Error::new(ErrorKind::UnknownDirective, token.value, token.pos, "directive name is empty."));
        }
        let directive = Directive::from_name(&name.value).ok_or_else(|| {
            Error::new(ErrorKind::UnknownDirective, &name.value, name.pos, "invalid directive name.")
        })?;
        if !self.config.seen.insert(directive) {
            return Err(Error::new(ErrorKind::DuplicateDirective, &name.value, name.pos, "duplicate directive."));
        }
        Ok(directive)
    }

    fn arguments(&mut self, directive: Directive) -> Result<Vec<Token>> {
        let mut args = Vec::new();
        loop {
            self.tokenizer.skip_space();
            if self.tokenizer.is_eof() || self.tokenizer.at_terminator() {
                break;
            }
            let arg = match directive {
                Directive::ErrorLog => self.tokenizer.parse_raw(),
                _ => self.tokenizer.parse_argument(),
            };
            if arg.value.is_empty() {
                let token = self.tokenizer.unexpected();
                return Err(invalid_argument(&token, "unexpected character in argument."));
            }
            trace!("argument {:?}", arg);
            args.push(arg);
        }
        Ok(args)
    }

    // The block body starts right after the keyword.
    fn block<B: BlockBody>(&mut self) -> Result<B> {
        let mut pos = self.tokenizer.save_pos();
        let block = B::parse_body(self.tokenizer.data(), &mut pos)?;
        self.tokenizer.restore_pos(pos);
        Ok(block)
    }

    fn env(&mut self, arg: &Token) -> Result<()> {
        match arg.value.find('=') {
            Some(eq) if eq > 0 => {
                let key = arg.value[..eq].to_string();
                let value = arg.value[eq + 1..].to_string();
                self.config.env.insert(key, value);
                Ok(())
            }
            _ => Err(invalid_argument(arg, "env argument should be KEY=VALUE.")),
        }
    }

    fn worker_processes(&mut self, arg: &Token) -> Result<()> {
        match arg.value.parse::<u32>() {
            Ok(n) if n >= 1 => {
                self.config.worker_processes = n;
                Ok(())
            }
            _ => Err(invalid_argument(
                arg,
                "worker_processes argument should not include string or not be negative.",
            )),
        }
    }

    fn daemon(&mut self, arg: &Token) -> Result<()> {
        self.config.daemon = match arg.value.as_str() {
            "on" => true,
            "off" => false,
            _ => return Err(invalid_argument(arg, "invalid argument.")),
        };
        Ok(())
    }

    // NOTE: "ms" multiplies by 1000, "s" and no unit store the number as-is.
    fn timer_resolution(&mut self, arg: &Token) -> Result<()> {
        static RE_TIMER: Lazy<Regex> = Lazy::new(|| {
            let re = r"^(?P<value>[0-9]*)(?P<unit>.*)$";
            Regex::new(re).expect("could not compile RE_TIMER regexp")
        });
        let caps = RE_TIMER
            .captures(&arg.value)
            .ok_or_else(|| invalid_argument(arg, "invalid argument."))?;
        let value = caps["value"]
            .parse::<u64>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| invalid_argument(arg, "invalid argument."))?;
        self.config.timer_resolution = match &caps["unit"] {
            "ms" => value
                .checked_mul(1000)
                .ok_or_else(|| invalid_argument(arg, "invalid argument."))?,
            "s" | "" => value,
            _ => return Err(invalid_argument(arg, "invalid argument.")),
        };
        Ok(())
    }

    // The argument is parsed as an abs_path with a '/' put in front.
    // Errors quote the argument as written, positions stay buffer offsets.
    fn error_log(&mut self, arg: &Token) -> Result<()> {
        let path = format!("/{}", arg.value);
        let mut parser = UriParser::with_base(&path, arg.pos.saturating_sub(1));
        self.config.error_log = parser.complete_abs_path().map_err(|mut e| {
            e.fragment = arg.value.clone();
            e
        })?;
        Ok(())
    }
}

fn invalid_argument(arg: &Token, msg: &str) -> Error {
    Error::new(ErrorKind::InvalidArgument, &arg.value, arg.pos, msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn parse(s: &str) -> Result<MainConfig> {
        init();
        Parser::from_str(s).parse()
    }

    fn kind(s: &str) -> ErrorKind {
        parse(s).unwrap_err().kind
    }

    #[test]
    fn test_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.is_daemon_on(), false);
        assert_eq!(cfg.worker_processes(), 4);
        assert_eq!(cfg.timer_resolution(), 100);
        assert!(cfg.error_log().is_empty());
        assert!(cfg.env_map().is_empty());

        let cfg = parse("\n\n   \n;\n# nothing here\n").unwrap();
        assert_eq!(cfg.worker_processes(), 4);
    }

    #[test]
    fn test_full() {
        let text = r#"
            # main block
            daemon on;
            worker_processes 8;
            timer_resolution 100ms;
            error_log logs/error.log;
            env PATH=bin;
            events
            http
        "#;
        let cfg = parse(text).unwrap();
        assert!(cfg.is_daemon_on());
        assert_eq!(cfg.worker_processes(), 8);
        assert_eq!(cfg.timer_resolution(), 100000);
        assert_eq!(cfg.error_log(), ["logs", "error.log"]);
        assert_eq!(cfg.env("path"), Some("bin"));
        assert!(cfg.http_block().is_some());
        assert!(cfg.event_block().is_some());
        for d in Directive::ALL.iter() {
            assert!(cfg.has_directive(*d), "{:?}", d);
        }
    }

    #[test]
    fn test_worker_processes() {
        for n in &[1u32, 2, 16, 1024, 4294967295] {
            let cfg = parse(&format!("worker_processes {}\n", n)).unwrap();
            assert_eq!(cfg.worker_processes(), *n);
        }
        assert_eq!(kind("worker_processes 0"), ErrorKind::InvalidArgument);
        assert_eq!(kind("worker_processes -1"), ErrorKind::InvalidArgument);
        assert_eq!(kind("worker_processes abc"), ErrorKind::InvalidArgument);
        assert_eq!(kind("worker_processes 4x"), ErrorKind::InvalidArgument);
        assert_eq!(kind("worker_processes 4294967296"), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_duplicate() {
        for d in Directive::ALL.iter() {
            let line = match d {
                Directive::Env => "env A=b",
                Directive::WorkerProcesses => "worker_processes 2",
                Directive::Daemon => "daemon on",
                Directive::TimerResolution => "timer_resolution 5",
                Directive::ErrorLog => "error_log a.log",
                Directive::Http => "http",
                Directive::Events => "events",
            };
            let err = parse(&format!("{};\n{};\n", line, line)).unwrap_err();
            assert_eq!(err.kind, ErrorKind::DuplicateDirective, "{}", line);
            assert_eq!(err.pos, line.len() + 2);
        }
        // argument content doesn't matter.
        assert_eq!(kind("daemon on\ndaemon off\n"), ErrorKind::DuplicateDirective);
        // neither does case.
        assert_eq!(kind("daemon on\nDAEMON on\n"), ErrorKind::DuplicateDirective);
    }

    #[test]
    fn test_timer_resolution() {
        assert_eq!(parse("timer_resolution 100ms").unwrap().timer_resolution(), 100000);
        assert_eq!(parse("timer_resolution 5s").unwrap().timer_resolution(), 5);
        assert_eq!(parse("timer_resolution 5").unwrap().timer_resolution(), 5);
        assert_eq!(parse("timer_resolution 7MS").unwrap().timer_resolution(), 7000);
        assert_eq!(kind("timer_resolution 0ms"), ErrorKind::InvalidArgument);
        assert_eq!(kind("timer_resolution ms"), ErrorKind::InvalidArgument);
        assert_eq!(kind("timer_resolution 5h"), ErrorKind::InvalidArgument);
        assert_eq!(kind("timer_resolution 5s5"), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_daemon() {
        assert_eq!(parse("daemon on").unwrap().is_daemon_on(), true);
        assert_eq!(parse("daemon off").unwrap().is_daemon_on(), false);
        assert_eq!(parse("daemon On;").unwrap().is_daemon_on(), true);
        let err = parse("daemon maybe").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(err.fragment, "maybe");
        assert_eq!(err.pos, 7);
        assert_eq!(err.to_string(), "Error:8 \"maybe\" invalid argument.");
    }

    #[test]
    fn test_env() {
        let cfg = parse("env HOME=root").unwrap();
        assert_eq!(cfg.env("home"), Some("root"));
        assert_eq!(cfg.env("HOME"), None);

        let cfg = parse("env EMPTY=").unwrap();
        assert_eq!(cfg.env("empty"), Some(""));

        assert_eq!(kind("env HOME"), ErrorKind::InvalidArgument);
        assert_eq!(kind("env =root"), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_error_log() {
        let cfg = parse("error_log logs/error.log").unwrap();
        assert_eq!(cfg.error_log(), ["logs", "error.log"]);

        let cfg = parse("error_log   Logs/Error.log   ; keep the case\n").unwrap();
        assert_eq!(cfg.error_log(), ["Logs", "Error.log"]);

        let cfg = parse("error_log error.log;level=warn\r\n").unwrap();
        assert_eq!(cfg.error_log(), ["error.log"]);

        let err = parse("error_log logs/my file.log\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidUriSyntax);
        assert_eq!(err.pos, 17);
        assert_eq!(err.fragment, "logs/my file.log");
        assert_eq!(err.to_string(), "Error:18 \"logs/my file.log\" is invalid path syntax");

        let err = parse("error_log ;\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgumentCount);
        assert_eq!(err.fragment, "error_log");
    }

    #[test]
    fn test_arity() {
        let err = parse("daemon on off").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgumentCount);
        assert_eq!(err.fragment, "off");
        assert_eq!(err.pos, 10);

        let err = parse("  worker_processes;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgumentCount);
        assert_eq!(err.fragment, "worker_processes");
        assert_eq!(err.pos, 2);

        assert_eq!(kind("http on"), ErrorKind::InvalidArgumentCount);
        assert_eq!(kind("events 1\n"), ErrorKind::InvalidArgumentCount);
    }

    #[test]
    fn test_unknown() {
        let err = parse("daemon on\nlisten 80\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownDirective);
        assert_eq!(err.fragment, "listen");
        assert_eq!(err.pos, 10);

        let err = parse("80 listen\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownDirective);
        assert_eq!(err.fragment, "8");
        assert_eq!(err.to_string(), "Error:1 \"8\" directive name is empty.");
    }

    #[test]
    fn test_comments_and_line_endings() {
        let text = "daemon on; worker_processes 9\r\n\tworker_processes 3 # three\rtimer_resolution 2s";
        let cfg = parse(text).unwrap();
        assert!(cfg.is_daemon_on());
        assert_eq!(cfg.worker_processes(), 3);
        assert_eq!(cfg.timer_resolution(), 2);
    }

    #[test]
    fn test_error_output_is_rejected() {
        let err = parse("daemon maybe").unwrap_err();
        assert!(parse(&err.to_string()).is_err());
        let err = parse("error_log a b\n").unwrap_err();
        assert!(parse(&err.to_string()).is_err());
    }

    #[test]
    fn test_independent_parses() {
        let a = parse("worker_processes 2").unwrap();
        let b = parse("worker_processes 3").unwrap();
        assert_eq!(a.worker_processes(), 2);
        assert_eq!(b.worker_processes(), 3);

        let handles: Vec<_> = (1..5u32)
            .map(|n| std::thread::spawn(move || Parser::from_str(&format!("worker_processes {}", n)).parse()))
            .collect();
        for (n, h) in (1..5u32).zip(handles) {
            assert_eq!(h.join().unwrap().unwrap().worker_processes(), n);
        }
    }

    #[test]
    fn test_directive_set() {
        let mut set = DirectiveSet::default();
        assert!(set.insert(Directive::Http));
        assert!(!set.insert(Directive::Http));
        assert!(set.contains(Directive::Http));
        assert!(!set.contains(Directive::Events));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Directive::Http]);
        assert_eq!(Directive::from_name("error_log"), Some(Directive::ErrorLog));
        assert_eq!(Directive::from_name("ERROR_LOG"), None);
    }
}
