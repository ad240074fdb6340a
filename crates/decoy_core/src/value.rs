//! Dynamic value model.
//!
//! Spies stand in for functions that live on shared, mutable objects, so the
//! values they receive and the objects they patch are modelled dynamically:
//!
//! - **Scalars**: undefined, null, booleans, numbers, bigints, strings, symbols, dates, regexps
//! - **References**: errors, arrays, objects, functions and promises, compared by identity
//! - **Sentinels**: [`Value::Ignore`] and [`Value::Matcher`] for argument verification
//!
//! Objects keep their own keys in insertion order. A property may be
//! read-only, which is how getter-only exports and frozen namespaces show up.

use crate::error::{CoreError, CoreResult, Thrown};
use crate::id::FunctionId;
use crate::matcher::Matcher;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Outcome of calling a function: a returned value or a thrown one
pub type CallResult = Result<Value, Thrown>;

/// Runtime type tag of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Booleans
    Boolean,
    /// IEEE-754 numbers
    Number,
    /// Arbitrary precision integers (bounded to i128 here)
    BigInt,
    /// Strings
    String,
    /// Symbols
    Symbol,
    /// Dates
    Date,
    /// Regular expressions
    RegExp,
    /// Error objects
    Error,
    /// Arrays
    Array,
    /// Plain or class-named objects
    Object,
    /// Callables
    Function,
    /// Settled promises
    Promise,
    /// The wildcard sentinel
    Ignore,
    /// Comparator wrappers
    Matcher,
}

impl Tag {
    /// Display name of the tag
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::BigInt => "bigint",
            Self::String => "string",
            Self::Symbol => "symbol",
            Self::Date => "date",
            Self::RegExp => "regexp",
            Self::Error => "error",
            Self::Array => "array",
            Self::Object => "object",
            Self::Function => "function",
            Self::Promise => "promise",
            Self::Ignore => "ignore",
            Self::Matcher => "matcher",
        }
    }

    /// Whether values of this tag are compared key by key
    #[must_use]
    pub fn is_composite(self) -> bool {
        matches!(self, Self::Array | Self::Object)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamic value
#[derive(Clone)]
pub enum Value {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// BigInt
    BigInt(i128),
    /// String
    Str(String),
    /// Symbol
    Symbol(Symbol),
    /// Date as milliseconds since the epoch
    Date(i64),
    /// Regular expression in `/source/flags` form
    RegExp(String),
    /// Error object
    Error(ErrorValue),
    /// Array
    Array(ArrayRef),
    /// Object
    Object(ObjectRef),
    /// Function
    Function(Function),
    /// Settled promise
    Promise(Promise),
    /// Wildcard: matches anything during comparison
    Ignore,
    /// Comparator wrapper consulted instead of structural comparison
    Matcher(Matcher),
}

impl Value {
    /// The wildcard sentinel
    pub const IGNORE: Value = Value::Ignore;

    /// Runtime tag
    #[must_use]
    pub fn tag(&self) -> Tag {
        match self {
            Self::Undefined => Tag::Undefined,
            Self::Null => Tag::Null,
            Self::Bool(_) => Tag::Boolean,
            Self::Number(_) => Tag::Number,
            Self::BigInt(_) => Tag::BigInt,
            Self::Str(_) => Tag::String,
            Self::Symbol(_) => Tag::Symbol,
            Self::Date(_) => Tag::Date,
            Self::RegExp(_) => Tag::RegExp,
            Self::Error(_) => Tag::Error,
            Self::Array(_) => Tag::Array,
            Self::Object(_) => Tag::Object,
            Self::Function(_) => Tag::Function,
            Self::Promise(_) => Tag::Promise,
            Self::Ignore => Tag::Ignore,
            Self::Matcher(_) => Tag::Matcher,
        }
    }

    /// Build an array value
    #[must_use]
    pub fn array(items: Vec<Value>) -> Self {
        Self::Array(ArrayRef::new(items))
    }

    /// Build a plain object value from key/value pairs
    #[must_use]
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(ObjectRef::from_entries(entries))
    }

    /// Build a function value
    #[must_use]
    pub fn function<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult + 'static,
    {
        Self::Function(Function::new(name, body))
    }

    /// Build an error value
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorValue::new(message))
    }

    /// Build a date value
    #[must_use]
    pub fn date(millis: i64) -> Self {
        Self::Date(millis)
    }

    /// Build a regexp value from its `/source/flags` form
    #[must_use]
    pub fn regexp(source: impl Into<String>) -> Self {
        Self::RegExp(source.into())
    }

    /// Build a fresh symbol
    #[must_use]
    pub fn symbol(description: &str) -> Self {
        Self::Symbol(Symbol::new(Some(description)))
    }

    /// Build a comparator wrapper around `predicate`
    #[must_use]
    pub fn compare<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<bool> + 'static,
    {
        Self::Matcher(Matcher::compare(predicate))
    }

    /// Build a mapper wrapper: the actual value is called with `args` and the
    /// result must equal `expected`
    #[must_use]
    pub fn mapper(args: Vec<Value>, expected: impl Into<Value>) -> Self {
        Self::Matcher(Matcher::mapper(args, expected.into()))
    }

    /// Check for `undefined`
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Check for `null`
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check for a callable
    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as number
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as bool
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as function
    #[must_use]
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Get as object
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get as array
    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as promise
    #[must_use]
    pub fn as_promise(&self) -> Option<&Promise> {
        match self {
            Self::Promise(p) => Some(p),
            _ => None,
        }
    }

    /// Truthiness as the host language defines it
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::BigInt(n) => *n != 0,
            Self::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Identity / primitive equality (`===`)
    ///
    /// NaN is not strictly equal to itself; reference values compare by
    /// pointer. Dates and regexps are stored by value and compare by value.
    #[must_use]
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Ignore, Self::Ignore) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::RegExp(a), Self::RegExp(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a.ptr_eq(b),
            (Self::Error(a), Self::Error(b)) => a.ptr_eq(b),
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Promise(a), Self::Promise(b)) => a.ptr_eq(b),
            (Self::Matcher(a), Self::Matcher(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Read a member by key: array index or object property
    #[must_use]
    pub fn member(&self, key: &str) -> Value {
        match self {
            Self::Array(arr) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| arr.get(i))
                .unwrap_or(Value::Undefined),
            Self::Object(obj) => obj.get(key).unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Undefined
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shallow on purpose: references may be cyclic.
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::BigInt(n) => write!(f, "{n}n"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Symbol(s) => write!(f, "Symbol({})", s.description().unwrap_or("")),
            Self::Date(ms) => write!(f, "Date({ms})"),
            Self::RegExp(src) => write!(f, "{src}"),
            Self::Error(e) => write!(f, "{}({:?})", e.name(), e.message()),
            Self::Array(a) => write!(f, "Array(len={})", a.len()),
            Self::Object(o) => write!(f, "{}(keys={:?})", o.class_name().unwrap_or_else(|| "Object".to_string()), o.own_keys()),
            Self::Function(func) => write!(f, "Function({})", func.name()),
            Self::Promise(p) => write!(f, "Promise(rejected={})", p.is_rejected()),
            Self::Ignore => write!(f, "Ignore"),
            Self::Matcher(_) => write!(f, "Matcher"),
        }
    }
}

macro_rules! debug_as_value {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Debug::fmt(&Value::$variant(self.clone()), f)
                }
            }
        )*
    };
}

debug_as_value! {
    Symbol => Symbol,
    ErrorValue => Error,
    ArrayRef => Array,
    ObjectRef => Object,
    Function => Function,
    Promise => Promise,
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::array(items)
    }
}

impl From<ArrayRef> for Value {
    fn from(arr: ArrayRef) -> Self {
        Self::Array(arr)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Self::Function(func)
    }
}

impl From<ErrorValue> for Value {
    fn from(err: ErrorValue) -> Self {
        Self::Error(err)
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Self {
        Self::Symbol(sym)
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Self {
        Self::Promise(p)
    }
}

impl From<Matcher> for Value {
    fn from(m: Matcher) -> Self {
        Self::Matcher(m)
    }
}

/// Build a `Vec<Value>` from heterogeneous literals
///
/// ```
/// use decoy_core::{values, Value};
/// let args = values![1, "a", true];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! values {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($item:expr),+ $(,)?) => {
        vec![$($crate::Value::from($item)),+]
    };
}

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// Unique symbol; two symbols are equal only if they are the same symbol
#[derive(Clone)]
pub struct Symbol(Rc<Option<String>>);

impl Symbol {
    /// Create a new symbol
    #[must_use]
    pub fn new(description: Option<&str>) -> Self {
        Self(Rc::new(description.map(str::to_string)))
    }

    /// Symbol description
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Identity comparison
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

// ---------------------------------------------------------------------------
// ErrorValue
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ErrorData {
    name: String,
    message: String,
}

/// Error object with a name and a message
#[derive(Clone)]
pub struct ErrorValue(Rc<ErrorData>);

impl ErrorValue {
    /// Create a plain `Error`
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_name("Error", message)
    }

    /// Create an error with a specific name (`TypeError`, ...)
    #[must_use]
    pub fn with_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self(Rc::new(ErrorData {
            name: name.into(),
            message: message.into(),
        }))
    }

    /// Error name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Error message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0.message
    }

    /// Identity comparison
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

// ---------------------------------------------------------------------------
// ArrayRef
// ---------------------------------------------------------------------------

/// Shared, mutable array
#[derive(Clone, Default)]
pub struct ArrayRef(Rc<RefCell<Vec<Value>>>);

impl ArrayRef {
    /// Create an array holding `items`
    #[must_use]
    pub fn new(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Element at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Append an element
    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    /// Replace the element at `index`, growing the array with `undefined`
    pub fn set(&self, index: usize, value: Value) {
        let mut items = self.0.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value;
    }

    /// Snapshot of the elements
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    /// Identity comparison
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address used for identity sets
    #[must_use]
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

// ---------------------------------------------------------------------------
// ObjectRef
// ---------------------------------------------------------------------------

/// One own property
#[derive(Clone)]
pub struct Property {
    /// Stored value
    pub value: Value,
    /// Whether assignment is permitted
    pub writable: bool,
}

#[derive(Default)]
struct ObjectData {
    class: Option<String>,
    prototype: Option<ObjectRef>,
    properties: IndexMap<String, Property>,
}

/// Shared, mutable object
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<ObjectData>>);

impl ObjectRef {
    /// Create an empty plain object
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a plain object from key/value pairs
    #[must_use]
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let obj = Self::new();
        {
            let mut data = obj.0.borrow_mut();
            for (key, value) in entries {
                data.properties.insert(
                    key.into(),
                    Property {
                        value,
                        writable: true,
                    },
                );
            }
        }
        obj
    }

    /// Set the class (constructor) name
    #[must_use]
    pub fn with_class(self, name: impl Into<String>) -> Self {
        self.0.borrow_mut().class = Some(name.into());
        self
    }

    /// Set the prototype whose members are inherited but not enumerated
    #[must_use]
    pub fn with_prototype(self, prototype: ObjectRef) -> Self {
        self.0.borrow_mut().prototype = Some(prototype);
        self
    }

    /// Insert a writable property
    #[must_use]
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.borrow_mut().properties.insert(
            key.into(),
            Property {
                value: value.into(),
                writable: true,
            },
        );
        self
    }

    /// Class name, `None` for plain objects
    #[must_use]
    pub fn class_name(&self) -> Option<String> {
        self.0.borrow().class.clone()
    }

    /// Prototype object
    #[must_use]
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.0.borrow().prototype.clone()
    }

    /// Read a property, falling back to the prototype chain
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut seen = vec![self.addr()];
        let mut current = self.clone();
        loop {
            if let Some(value) = current.get_own(key) {
                return Some(value);
            }
            let next = current.prototype()?;
            if seen.contains(&next.addr()) {
                return None;
            }
            seen.push(next.addr());
            current = next;
        }
    }

    /// Read an own property
    #[must_use]
    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.0.borrow().properties.get(key).map(|p| p.value.clone())
    }

    /// Check for an own property
    #[must_use]
    pub fn has_own(&self, key: &str) -> bool {
        self.0.borrow().properties.contains_key(key)
    }

    /// Own enumerable keys in insertion order
    #[must_use]
    pub fn own_keys(&self) -> Vec<String> {
        self.0.borrow().properties.keys().cloned().collect()
    }

    /// Number of own properties
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().properties.len()
    }

    /// Check if there are no own properties
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().properties.is_empty()
    }

    /// Whether `key` may be assigned
    #[must_use]
    pub fn is_writable(&self, key: &str) -> bool {
        self.0
            .borrow()
            .properties
            .get(key)
            .map(|p| p.writable)
            .unwrap_or(true)
    }

    /// Assign a property
    ///
    /// # Errors
    ///
    /// Returns error if the own property is read-only
    pub fn set(&self, key: &str, value: impl Into<Value>) -> CoreResult<()> {
        let mut data = self.0.borrow_mut();
        match data.properties.get_mut(key) {
            Some(prop) if !prop.writable => Err(CoreError::ReadOnlyProperty {
                key: key.to_string(),
            }),
            Some(prop) => {
                prop.value = value.into();
                Ok(())
            }
            None => {
                data.properties.insert(
                    key.to_string(),
                    Property {
                        value: value.into(),
                        writable: true,
                    },
                );
                Ok(())
            }
        }
    }

    /// Define a read-only property, replacing any existing one
    pub fn define_readonly(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().properties.insert(
            key.into(),
            Property {
                value: value.into(),
                writable: false,
            },
        );
    }

    /// Make every own property read-only
    pub fn freeze(&self) {
        for prop in self.0.borrow_mut().properties.values_mut() {
            prop.writable = false;
        }
    }

    /// Remove an own property
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0
            .borrow_mut()
            .properties
            .shift_remove(key)
            .map(|p| p.value)
    }

    /// Identity comparison
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address used for identity sets
    #[must_use]
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

// ---------------------------------------------------------------------------
// Function
// ---------------------------------------------------------------------------

type Body = dyn Fn(&[Value]) -> CallResult;
type RestoreCallback = Box<dyn FnOnce()>;

struct FunctionData {
    id: FunctionId,
    name: String,
    body: Box<Body>,
    on_restore: RefCell<Option<RestoreCallback>>,
}

/// Named callable value
#[derive(Clone)]
pub struct Function(Rc<FunctionData>);

impl Function {
    /// Create a function
    #[must_use]
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult + 'static,
    {
        Self(Rc::new(FunctionData {
            id: FunctionId::next(),
            name: name.into(),
            body: Box::new(body),
            on_restore: RefCell::new(None),
        }))
    }

    /// Unique id
    #[must_use]
    pub fn id(&self) -> FunctionId {
        self.0.id
    }

    /// Function name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Invoke with positional arguments
    ///
    /// # Errors
    ///
    /// Returns the thrown value if the body throws
    pub fn call(&self, args: &[Value]) -> CallResult {
        (self.0.body)(args)
    }

    /// Attach the callback fired when a patch installing this function is undone
    pub fn set_on_restore(&self, callback: impl FnOnce() + 'static) {
        *self.0.on_restore.borrow_mut() = Some(Box::new(callback));
    }

    /// Fire and clear the on-restore callback, if any
    pub fn fire_on_restore(&self) {
        let callback = self.0.on_restore.borrow_mut().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Identity comparison
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

// ---------------------------------------------------------------------------
// Promise
// ---------------------------------------------------------------------------

/// Already-settled asynchronous result
#[derive(Clone)]
pub struct Promise(Rc<CallResult>);

impl Promise {
    /// A promise fulfilled with `value`
    #[must_use]
    pub fn resolved(value: Value) -> Self {
        Self(Rc::new(Ok(value)))
    }

    /// A promise rejected with `reason`
    #[must_use]
    pub fn rejected(reason: Thrown) -> Self {
        Self(Rc::new(Err(reason)))
    }

    /// Whether the promise was rejected
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.0.is_err()
    }

    /// Settlement outcome
    #[must_use]
    pub fn result(&self) -> CallResult {
        (*self.0).clone()
    }

    /// Await the settlement
    #[must_use]
    pub fn settled(&self) -> futures::future::Ready<CallResult> {
        futures::future::ready(self.result())
    }

    /// Identity comparison
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
