//! Command arguments.
//!
//! Commands are an ordered list of binary-safe arguments. `ToArg` converts
//! common Rust values into their wire form so callers can mix strings,
//! bytes and integers in one command.

/// Converts a value into a single RESP bulk-string argument.
pub trait ToArg {
    fn to_arg(&self) -> Vec<u8>;
}

impl ToArg for [u8] {
    fn to_arg(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl<const N: usize> ToArg for [u8; N] {
    fn to_arg(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Vec<u8> {
        self.clone()
    }
}

impl ToArg for str {
    fn to_arg(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

macro_rules! number_to_arg {
    ($($ty:ty),*) => {
        $(
            impl ToArg for $ty {
                fn to_arg(&self) -> Vec<u8> {
                    self.to_string().into_bytes()
                }
            }
        )*
    };
}

number_to_arg!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f64);

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Vec<u8> {
        (**self).to_arg()
    }
}

/// A named command with its positional arguments.
///
/// ```
/// use mkv_client::Command;
///
/// let cmd = Command::new("ZADD").arg("board").arg(42).arg("alice");
/// assert_eq!(cmd.name(), "ZADD");
/// assert_eq!(cmd.arguments(), &[b"board".to_vec(), b"42".to_vec(), b"alice".to_vec()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<Vec<u8>>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Command {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg<T: ToArg>(mut self, value: T) -> Self {
        self.args.push(value.to_arg());
        self
    }

    /// Appends every item of `values` in order.
    pub fn args<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToArg,
    {
        self.args.extend(values.into_iter().map(|value| value.to_arg()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// Full wire form: name followed by arguments.
    pub(crate) fn to_frame(&self) -> Vec<&[u8]> {
        let mut frame = Vec::with_capacity(self.args.len() + 1);
        frame.push(self.name.as_bytes());
        frame.extend(self.args.iter().map(Vec::as_slice));
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_use_decimal_text() {
        assert_eq!(1.5f64.to_arg(), b"1.5");
        assert_eq!(2.0f64.to_arg(), b"2");
        assert_eq!(u64::MAX.to_arg(), b"18446744073709551615");
        assert_eq!((-3isize).to_arg(), b"-3");
    }

    #[test]
    fn mixes_argument_types() {
        let cmd = Command::new("SET")
            .arg("key")
            .arg(b"raw")
            .arg(&String::from("owned"))
            .arg(-5i64)
            .arg(7u16);
        assert_eq!(
            cmd.arguments(),
            &[
                b"key".to_vec(),
                b"raw".to_vec(),
                b"owned".to_vec(),
                b"-5".to_vec(),
                b"7".to_vec(),
            ]
        );
    }

    #[test]
    fn frame_starts_with_name() {
        let cmd = Command::new("HGET").args(["h", "f"]);
        let expected: Vec<&[u8]> = vec![b"HGET", b"h", b"f"];
        assert_eq!(cmd.to_frame(), expected);
    }
}
