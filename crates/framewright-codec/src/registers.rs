//! Configuration registers, command codes and packet opcodes
//!
//! Values that are not in the tables still round-trip through the `Other`
//! variants so that unknown registers decode instead of failing.

use std::fmt;
use std::str::FromStr;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident($raw:ty), $label:literal {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal => $text:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
            /// Value with no symbolic name
            Other($raw),
        }

        impl $name {
            /// Decode a raw value
            pub fn from_raw(raw: $raw) -> Self {
                match raw {
                    $($value => Self::$variant,)*
                    other => Self::Other(other),
                }
            }

            /// Raw wire value
            pub fn raw(self) -> $raw {
                match self {
                    $(Self::$variant => $value,)*
                    Self::Other(raw) => raw,
                }
            }

            /// Symbolic name, if the value has one
            pub fn name(self) -> Option<&'static str> {
                match self {
                    $(Self::$variant => Some($text),)*
                    Self::Other(_) => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.name() {
                    Some(name) => f.write_str(name),
                    None => write!(f, concat!($label, "{:04x}"), self.raw()),
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)*
                    other => other
                        .strip_prefix($label)
                        .and_then(|hex| <$raw>::from_str_radix(hex, 16).ok())
                        .map(Self::from_raw)
                        .ok_or_else(|| format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }
    };
}

wire_enum! {
    /// Type 1 packet register addresses
    Register(u16), "reg" {
        /// CRC check value
        Crc = 0x00 => "CRC",
        /// Frame address
        Far = 0x01 => "FAR",
        /// Frame data input
        Fdri = 0x02 => "FDRI",
        /// Frame data output
        Fdro = 0x03 => "FDRO",
        /// Command
        Cmd = 0x04 => "CMD",
        Ctl0 = 0x05 => "CTL0",
        Mask = 0x06 => "MASK",
        Stat = 0x07 => "STAT",
        Lout = 0x08 => "LOUT",
        Cor0 = 0x09 => "COR0",
        Mfwr = 0x0A => "MFWR",
        Cbc = 0x0B => "CBC",
        Idcode = 0x0C => "IDCODE",
        Axss = 0x0D => "AXSS",
        Cor1 = 0x0E => "COR1",
        Wbstar = 0x10 => "WBSTAR",
        Timer = 0x11 => "TIMER",
        Bootsts = 0x16 => "BOOTSTS",
        Ctl1 = 0x18 => "CTL1",
        Bspi = 0x1F => "BSPI",
    }
}

wire_enum! {
    /// Values written to the CMD register
    Command(u32), "cmd" {
        Null = 0x00 => "NULL",
        /// Write configuration data
        Wcfg = 0x01 => "WCFG",
        Mfw = 0x02 => "MFW",
        Dghigh = 0x03 => "DGHIGH",
        Rcfg = 0x04 => "RCFG",
        /// Begin the startup sequence
        Start = 0x05 => "START",
        Rcap = 0x06 => "RCAP",
        /// Reset the CRC accumulator
        Rcrc = 0x07 => "RCRC",
        Aghigh = 0x08 => "AGHIGH",
        Switch = 0x09 => "SWITCH",
        Grestore = 0x0A => "GRESTORE",
        Shutdown = 0x0B => "SHUTDOWN",
        Gcapture = 0x0C => "GCAPTURE",
        /// End of configuration
        Desync = 0x0D => "DESYNC",
        Iprog = 0x0F => "IPROG",
        Crcc = 0x10 => "CRCC",
        Ltimer = 0x11 => "LTIMER",
        BspiRead = 0x12 => "BSPI_READ",
        FallEdge = 0x13 => "FALL_EDGE",
    }
}

impl Default for Register {
    fn default() -> Self {
        Register::Crc
    }
}

/// Packet opcode (header bits 28:27)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    Read,
    Write,
    Reserved,
}

impl Opcode {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Opcode::Nop,
            1 => Opcode::Read,
            2 => Opcode::Write,
            _ => Opcode::Reserved,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Opcode::Nop => 0,
            Opcode::Read => 1,
            Opcode::Write => 2,
            Opcode::Reserved => 3,
        }
    }
}
