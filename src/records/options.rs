//! Short-token option sets
//!
//! Several directives take a compact option list ("d,u,r") where each letter
//! enables one flag. `n`/`none` clears every flag, `a`/`all` sets every flag,
//! and an explicit letter list replaces whatever was there before. The same
//! letter tokens are used when serializing a flattened cache.

macro_rules! option_set {
    ($(#[$meta:meta])* $name:ident { $($tok:literal => $flag:ident = $bit:expr;)+ }) => {
        bitflags::bitflags! {
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
            pub struct $name: u8 {
                $(const $flag = $bit;)+
            }
        }

        impl $name {
            /// Parse a comma/space separated short-token list.
            pub fn parse(raw: &str) -> Result<Self, String> {
                let mut opts = Self::empty();
                for tok in raw.split([',', ' ']).map(str::trim).filter(|t| !t.is_empty()) {
                    match tok {
                        "n" | "none" => opts = Self::empty(),
                        "a" | "all" => opts = Self::all(),
                        $($tok => opts |= Self::$flag,)+
                        other => return Err(format!("unknown option '{}'", other)),
                    }
                }
                Ok(opts)
            }

            /// Letter-token form used by the cache grammar (`n` when empty,
            /// `a` when every flag is set).
            pub fn tokens(self) -> String {
                if self.is_empty() {
                    return "n".to_string();
                }
                if self == Self::all() {
                    return "a".to_string();
                }
                let mut out: Vec<&str> = Vec::new();
                $(
                    if self.contains(Self::$flag) {
                        out.push($tok);
                    }
                )+
                out.join(",")
            }
        }
    };
}

option_set! {
    /// States a host notification may fire for.
    HostNotifyOpts {
        "d" => DOWN = 0x01;
        "u" => UNREACHABLE = 0x02;
        "r" => RECOVERY = 0x04;
        "f" => FLAPPING = 0x08;
        "s" => DOWNTIME = 0x10;
    }
}

option_set! {
    /// States a service notification may fire for.
    ServiceNotifyOpts {
        "w" => WARNING = 0x01;
        "u" => UNKNOWN = 0x02;
        "c" => CRITICAL = 0x04;
        "r" => RECOVERY = 0x08;
        "f" => FLAPPING = 0x10;
        "s" => DOWNTIME = 0x20;
    }
}

option_set! {
    /// Host states an escalation is effective for.
    HostEscalationOpts {
        "d" => DOWN = 0x01;
        "u" => UNREACHABLE = 0x02;
        "r" => RECOVERY = 0x04;
    }
}

option_set! {
    /// Service states an escalation is effective for.
    ServiceEscalationOpts {
        "w" => WARNING = 0x01;
        "u" => UNKNOWN = 0x02;
        "c" => CRITICAL = 0x04;
        "r" => RECOVERY = 0x08;
    }
}

option_set! {
    /// Master host states that suppress the dependent host.
    HostDependencyOpts {
        "o" => UP = 0x01;
        "d" => DOWN = 0x02;
        "u" => UNREACHABLE = 0x04;
        "p" => PENDING = 0x08;
    }
}

option_set! {
    /// Master service states that suppress the dependent service.
    ServiceDependencyOpts {
        "o" => OK = 0x01;
        "w" => WARNING = 0x02;
        "u" => UNKNOWN = 0x04;
        "c" => CRITICAL = 0x08;
        "p" => PENDING = 0x10;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_letter_list() {
        let opts = ServiceNotifyOpts::parse("w,u,c").unwrap();
        assert_eq!(
            opts,
            ServiceNotifyOpts::WARNING | ServiceNotifyOpts::UNKNOWN | ServiceNotifyOpts::CRITICAL
        );
    }

    #[test]
    fn test_parse_space_separated() {
        let opts = HostNotifyOpts::parse("d r").unwrap();
        assert_eq!(opts, HostNotifyOpts::DOWN | HostNotifyOpts::RECOVERY);
    }

    #[test]
    fn test_none_clears_preceding_tokens() {
        let opts = HostNotifyOpts::parse("d,u,n").unwrap();
        assert!(opts.is_empty());
        let opts = HostNotifyOpts::parse("none").unwrap();
        assert!(opts.is_empty());
    }

    #[test]
    fn test_all_sets_everything() {
        assert_eq!(ServiceEscalationOpts::parse("a").unwrap(), ServiceEscalationOpts::all());
        assert_eq!(ServiceEscalationOpts::parse("all").unwrap(), ServiceEscalationOpts::all());
    }

    #[test]
    fn test_unknown_token_rejected() {
        assert!(HostNotifyOpts::parse("d,x").is_err());
    }

    #[test]
    fn test_token_round_trip() {
        let opts = ServiceNotifyOpts::parse("c,w").unwrap();
        assert_eq!(opts.tokens(), "w,c");
        assert_eq!(ServiceNotifyOpts::empty().tokens(), "n");
        assert_eq!(ServiceNotifyOpts::all().tokens(), "a");
    }
}
