//! Semantic role vocabulary for canonical nodes.
//!
//! Roles describe what a node *means* independent of the source grammar's
//! naming. The vocabulary is declared once through `define_roles!`; adding a
//! role is a one-line change to the list below.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_roles {
    ($($role:ident),* $(,)?) => {
        /// A semantic tag attached to a canonical node.
        ///
        /// # Examples
        ///
        /// ```rust
        /// use arbor::roles::Role;
        /// assert_eq!(Role::Statement.as_str(), "Statement");
        /// assert_eq!("Literal".parse::<Role>(), Ok(Role::Literal));
        /// assert!("NoSuchRole".parse::<Role>().is_err());
        /// ```
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Role {
            $($role,)*
        }

        impl Role {
            /// Every role in declaration order.
            pub const ALL: &'static [Role] = &[$(Role::$role,)*];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Role::$role => stringify!($role),)*
                }
            }
        }

        impl FromStr for Role {
            type Err = UnknownRole;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($role) => Ok(Role::$role),)*
                    _ => Err(UnknownRole(s.to_string())),
                }
            }
        }
    };
}

define_roles! {
    Identifier, Qualified, Operator, Binary, Unary, Left, Right, Infix, Postfix,
    Bitwise, Boolean, Unsigned, LeftShift, RightShift, Or, Xor, And,
    Expression, Statement, Equal, Not, LessThan, LessThanOrEqual, GreaterThan,
    GreaterThanOrEqual, Identical, Contains, Increment, Decrement, Negative,
    Positive, Dereference, TakeAddress, File, Add, Substract, Multiply, Divide,
    Modulo, Package, Declaration, Import, Pathname, Alias, Function, Body, Name,
    Receiver, Argument, Value, ArgsList, Base, Implements, Instance, Subtype,
    Subpackage, Module, Friend, World, If, Condition, Then, Else, Switch, Case,
    Default, For, Initialization, Update, Iterator, While, DoWhile, Break,
    Continue, Goto, Block, Scope, Return, Try, Catch, Finally, Throw, Assert,
    Call, Callee, Positional, Noop, Literal, Byte, ByteString, Character, List,
    Map, Null, Number, Regexp, Set, String, Tuple, Type, Entry, Key, Primitive,
    Assignment, This, Comment, Documentation, Whitespace, Incomplete,
    Unannotated, Visibility, Annotation, Anonymous, Enumeration, Arithmetic,
    Relational, Variable,
}

/// Error returned when a role name is not part of the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub std::string::String);

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Role> for std::string::String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl TryFrom<std::string::String> for Role {
    type Error = UnknownRole;

    fn try_from(s: std::string::String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
