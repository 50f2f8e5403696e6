//! Operator table: surface lexemes to canonical function symbols.

/// A CEL operator or macro name, as it appears after lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Conditional,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    Equals,
    NotEquals,
    Less,
    LessEquals,
    Greater,
    GreaterEquals,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Negate,
    Index,
    OptIndex,
    OptSelect,
    In,
    NotStrictlyFalse,
    Has,
    All,
    Exists,
    ExistsOne,
    Map,
    Filter,
}

impl Operator {
    /// The function name used for this operator in the AST.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Conditional => "_?_:_",
            Operator::LogicalAnd => "_&&_",
            Operator::LogicalOr => "_||_",
            Operator::LogicalNot => "!_",
            Operator::Equals => "_==_",
            Operator::NotEquals => "_!=_",
            Operator::Less => "_<_",
            Operator::LessEquals => "_<=_",
            Operator::Greater => "_>_",
            Operator::GreaterEquals => "_>=_",
            Operator::Add => "_+_",
            Operator::Subtract => "_-_",
            Operator::Multiply => "_*_",
            Operator::Divide => "_/_",
            Operator::Modulo => "_%_",
            Operator::Negate => "-_",
            Operator::Index => "_[_]",
            Operator::OptIndex => "_[?_]",
            Operator::OptSelect => "_?._",
            Operator::In => "@in",
            Operator::NotStrictlyFalse => "@not_strictly_false",
            Operator::Has => "has",
            Operator::All => "all",
            Operator::Exists => "exists",
            Operator::ExistsOne => "exists_one",
            Operator::Map => "map",
            Operator::Filter => "filter",
        }
    }

    /// Looks up a function symbol such as `_+_` and returns its operator.
    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        ALL.iter().copied().find(|op| op.symbol() == symbol)
    }

    /// Returns true for the operators that are macro names.
    pub fn is_macro(self) -> bool {
        find_macro(self.symbol()) == Some(self)
    }

    /// Returns true for the binary operators that bind in relation position.
    pub fn is_relation(self) -> bool {
        matches!(
            self,
            Operator::Equals
                | Operator::NotEquals
                | Operator::Less
                | Operator::LessEquals
                | Operator::Greater
                | Operator::GreaterEquals
                | Operator::In
        )
    }
}

const ALL: [Operator; 27] = [
    Operator::Conditional,
    Operator::LogicalAnd,
    Operator::LogicalOr,
    Operator::LogicalNot,
    Operator::Equals,
    Operator::NotEquals,
    Operator::Less,
    Operator::LessEquals,
    Operator::Greater,
    Operator::GreaterEquals,
    Operator::Add,
    Operator::Subtract,
    Operator::Multiply,
    Operator::Divide,
    Operator::Modulo,
    Operator::Negate,
    Operator::Index,
    Operator::OptIndex,
    Operator::OptSelect,
    Operator::In,
    Operator::NotStrictlyFalse,
    Operator::Has,
    Operator::All,
    Operator::Exists,
    Operator::ExistsOne,
    Operator::Map,
    Operator::Filter,
];

/// Maps a surface lexeme to its operator.
///
/// `-` resolves to binary subtraction; the builder picks [`Operator::Negate`]
/// itself when the minus is in prefix position.
pub fn operator_for_text(text: &str) -> Option<Operator> {
    let op = match text {
        "?" => Operator::Conditional,
        "&&" => Operator::LogicalAnd,
        "||" => Operator::LogicalOr,
        "!" => Operator::LogicalNot,
        "==" => Operator::Equals,
        "!=" => Operator::NotEquals,
        "<" => Operator::Less,
        "<=" => Operator::LessEquals,
        ">" => Operator::Greater,
        ">=" => Operator::GreaterEquals,
        "+" => Operator::Add,
        "-" => Operator::Subtract,
        "*" => Operator::Multiply,
        "/" => Operator::Divide,
        "%" => Operator::Modulo,
        "[" => Operator::Index,
        "[?" => Operator::OptIndex,
        "?." => Operator::OptSelect,
        "in" => Operator::In,
        "@not_strictly_false" => Operator::NotStrictlyFalse,
        name => return find_macro(name),
    };
    Some(op)
}

/// Recognizes the standard macro names.
pub fn find_macro(name: &str) -> Option<Operator> {
    match name {
        "has" => Some(Operator::Has),
        "all" => Some(Operator::All),
        "exists" => Some(Operator::Exists),
        "exists_one" => Some(Operator::ExistsOne),
        "map" => Some(Operator::Map),
        "filter" => Some(Operator::Filter),
        _ => None,
    }
}
