//! Command verbs
//!
//! A command string has the shape `verb:argument`. The verb set is closed;
//! anything outside it is rejected before compilation starts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A command verb recognised by the command compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    /// Sleep for N seconds
    Sleep,
    /// Resolve a host name
    Dnslog,
    /// Fetch a URL
    Httplog,
    /// Run a command string
    RawCmd,
    /// Run a command through `cmd.exe /c`
    WinCmd,
    /// Run a command through `/bin/sh -c`
    LinuxCmd,
    /// Load a BCEL-encoded class
    Bcel,
    /// Load a class file from disk via BCEL
    BcelClassFile,
    /// Load a BCEL-encoded class with a constructor argument
    BcelWithArgs,
    /// Load a class file from disk via BCEL with a constructor argument
    BcelClassFileWithArgs,
    /// Evaluate a script read from disk
    ScriptFile,
    /// Evaluate a base64-encoded script
    ScriptBase64,
    /// Copy a local file to a destination path
    UploadFile,
    /// Write base64-decoded bytes to a destination path
    UploadFileBase64,
    /// Load a class from a remote jar
    Loadjar,
    /// Load a class from a remote jar with a constructor argument
    LoadjarWithArgs,
    /// Define a class through Rhino's defining class loader
    MozillaDefiningClassLoader,
    /// Perform a naming-context lookup
    Jndi,
}

impl Verb {
    /// Every verb, in declaration order
    pub const ALL: [Verb; 18] = [
        Verb::Sleep,
        Verb::Dnslog,
        Verb::Httplog,
        Verb::RawCmd,
        Verb::WinCmd,
        Verb::LinuxCmd,
        Verb::Bcel,
        Verb::BcelClassFile,
        Verb::BcelWithArgs,
        Verb::BcelClassFileWithArgs,
        Verb::ScriptFile,
        Verb::ScriptBase64,
        Verb::UploadFile,
        Verb::UploadFileBase64,
        Verb::Loadjar,
        Verb::LoadjarWithArgs,
        Verb::MozillaDefiningClassLoader,
        Verb::Jndi,
    ];

    /// Verbs iterated for transform-category gadgets, in generation order
    pub const TRANSFORM: [Verb; 12] = [
        Verb::Dnslog,
        Verb::Httplog,
        Verb::RawCmd,
        Verb::WinCmd,
        Verb::LinuxCmd,
        Verb::Bcel,
        Verb::BcelWithArgs,
        Verb::ScriptBase64,
        Verb::Loadjar,
        Verb::LoadjarWithArgs,
        Verb::Jndi,
        Verb::MozillaDefiningClassLoader,
    ];

    /// The wire name of the verb
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Sleep => "sleep",
            Verb::Dnslog => "dnslog",
            Verb::Httplog => "httplog",
            Verb::RawCmd => "raw_cmd",
            Verb::WinCmd => "win_cmd",
            Verb::LinuxCmd => "linux_cmd",
            Verb::Bcel => "bcel",
            Verb::BcelClassFile => "bcel_class_file",
            Verb::BcelWithArgs => "bcel_with_args",
            Verb::BcelClassFileWithArgs => "bcel_class_file_with_args",
            Verb::ScriptFile => "script_file",
            Verb::ScriptBase64 => "script_base64",
            Verb::UploadFile => "upload_file",
            Verb::UploadFileBase64 => "upload_file_base64",
            Verb::Loadjar => "loadjar",
            Verb::LoadjarWithArgs => "loadjar_with_args",
            Verb::MozillaDefiningClassLoader => "mozilla_defining_class_loader",
            Verb::Jndi => "jndi",
        }
    }

    /// Number of `|`-separated segments the argument must have, if the verb
    /// takes a compound argument
    pub fn segments(&self) -> Option<usize> {
        match self {
            Verb::BcelWithArgs
            | Verb::BcelClassFileWithArgs
            | Verb::UploadFile
            | Verb::UploadFileBase64
            | Verb::Loadjar
            | Verb::MozillaDefiningClassLoader => Some(2),
            Verb::LoadjarWithArgs => Some(3),
            _ => None,
        }
    }

    /// Placeholder argument used when generating template artifacts.
    ///
    /// The `{{paramN}}` markers are substituted by the consumer of the
    /// generated files, not here.
    pub fn placeholder_argument(&self) -> &'static str {
        match self {
            Verb::LoadjarWithArgs => "http://{{param0}}|{{param1}}|{{param2}}",
            Verb::Loadjar => "http://{{param0}}|{{param1}}",
            Verb::BcelWithArgs | Verb::MozillaDefiningClassLoader => "{{param0}}|{{param1}}",
            // base64 of "{{param0}}"
            Verb::ScriptBase64 => "e3twYXJhbTB9fQ==",
            _ => "{{param0}}",
        }
    }

    /// Command string carrying the placeholder argument
    pub fn placeholder_command(&self) -> String {
        format!("{}:{}", self.as_str(), self.placeholder_argument())
    }

    /// Label used in artifact file names.
    ///
    /// Matches the wire name except for `script_base64`, whose artifacts are
    /// published as plain `script`.
    pub fn file_label(&self) -> &'static str {
        match self {
            Verb::ScriptBase64 => "script",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Verb::ALL
            .iter()
            .copied()
            .find(|verb| verb.as_str() == lowered)
            .ok_or_else(|| Error::UnknownVerb(s.to_string()))
    }
}
