#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`Construct::Claim`](crate::Construct::Claim).
///
/// ```
/// use fieldclaim::{Construct, claim};
///
/// let title = claim!(patterns: ["title"], body: [Construct::var("field")]);
/// let rest = claim!(binding: "f", body: [Construct::var("f"), Construct::text(",")]);
/// let built = claim!(patterns: ["<=email"], body: vec![Construct::var("field")]);
/// # let _ = (title, rest, built);
/// ```
#[macro_export]
macro_rules! claim {
    (@binding) => {
        "field"
    };
    (@binding $binding:expr) => {
        $binding
    };
    (
        $(patterns: [ $($pat:expr),* $(,)? ],)?
        $(binding: $binding:expr,)?
        body: [ $($node:expr),* $(,)? ]
        $(,)?
    ) => {
        $crate::Construct::Claim($crate::Claim {
            patterns: vec![ $($( $crate::PatternExpr::from($pat) ),*)? ],
            binding: ::std::string::String::from($crate::claim!(@binding $($binding)?)),
            body: vec![ $($node),* ],
        })
    };
    (
        $(patterns: [ $($pat:expr),* $(,)? ],)?
        $(binding: $binding:expr,)?
        body: $body:expr
        $(,)?
    ) => {
        $crate::Construct::Claim($crate::Claim {
            patterns: vec![ $($( $crate::PatternExpr::from($pat) ),*)? ],
            binding: ::std::string::String::from($crate::claim!(@binding $($binding)?)),
            body: $body,
        })
    };
}
