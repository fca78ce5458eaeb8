/// Type alias for a type code, e.g. _wff_ or _class_ (see [`Symbol`][crate::library::Symbol])
pub type TypeCode = u8;

/// Type alias for an identifier representing a variable or operator (see
/// [`Expression`][crate::Expression])
pub type Identifier = i32;

/// Type alias for the declaration sequence number of a symbol or rule
pub type SeqNum = u32;

/// Type alias for the index of a rule inside its [`Library`][crate::library::Library]
pub type RuleId = usize;

/// Type alias for the identifier of a step in a [`Worksheet`][crate::worksheet::Worksheet]
pub type StepId = usize;
