use crate::collection::{Document, FindOptions};
use crate::common::Value;
use crate::errors::{CofferError, CofferResult, ErrorKind};

const OPERATORS: [&str; 6] = ["$gt", "$gte", "$lt", "$lte", "$ne", "$in"];

/// Sort key of a document: the values of the order properties followed by
/// the primary key.
pub(crate) type SortKey = Vec<Value>;

/// A compiled [FindOptions] evaluated against documents of one collection.
pub(crate) struct Query<'a> {
    options: &'a FindOptions,
    primary_key: &'a str,
}

impl<'a> Query<'a> {
    /// Checks the query operators.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArgument` error for unknown operators or a `$in`
    /// operand that is not an array.
    pub(crate) fn new(options: &'a FindOptions, primary_key: &'a str) -> CofferResult<Self> {
        for (field, condition) in options.query.iter() {
            if let Some(operators) = operator_document(condition) {
                for (operator, operand) in operators.iter() {
                    if !OPERATORS.contains(&operator.as_str()) {
                        log::error!("Unknown operator {} on {}", operator, field);
                        return Err(CofferError::new(
                            &format!("unknown query operator {}", operator),
                            ErrorKind::InvalidArgument,
                        ));
                    }
                    if operator == "$in" && !operand.is_array() {
                        log::error!("$in on {} expects an array", field);
                        return Err(CofferError::new(
                            "$in expects an array",
                            ErrorKind::InvalidArgument,
                        ));
                    }
                }
            }
        }
        Ok(Query { options, primary_key })
    }

    pub(crate) fn matches(&self, document: &Document) -> bool {
        self.options.query.iter().all(|(field, condition)| {
            let actual = document.get(field).unwrap_or(&Value::Null);
            match operator_document(condition) {
                Some(operators) => operators
                    .iter()
                    .all(|(operator, operand)| apply_operator(operator, actual, operand)),
                None => actual == condition,
            }
        })
    }

    pub(crate) fn sort_key(&self, document: &Document) -> SortKey {
        let mut key: SortKey = self
            .options
            .order
            .iter()
            .map(|field| document.get(field).cloned().unwrap_or(Value::Null))
            .collect();
        key.push(document.get(self.primary_key).cloned().unwrap_or(Value::Null));
        key
    }

    fn in_range(&self, key: &SortKey) -> bool {
        let first = match key.first() {
            Some(first) => first,
            None => return true,
        };
        let options = self.options;
        options.start.as_ref().map_or(true, |start| first >= start)
            && options.start_after.as_ref().map_or(true, |after| first > after)
            && options.end.as_ref().map_or(true, |end| first <= end)
            && options.end_before.as_ref().map_or(true, |before| first < before)
    }

    /// Returns the matching documents in query order, holding at most
    /// `size` entries. Projection is left to the caller.
    pub(crate) fn select<I>(&self, documents: I, size: Option<usize>) -> Vec<(SortKey, Document)>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut selected: Vec<(SortKey, Document)> = documents
            .into_iter()
            .filter(|document| self.matches(document))
            .map(|document| (self.sort_key(&document), document))
            .filter(|(key, _)| self.in_range(key))
            .collect();
        selected.sort_by(|a, b| a.0.cmp(&b.0));
        if self.options.reverse {
            selected.reverse();
        }
        if let Some(size) = size {
            selected.truncate(size);
        }
        selected
    }
}

pub(crate) fn project(document: Document, properties: &[String], primary_key: &str) -> Document {
    let mut fields = properties.to_vec();
    if !fields.iter().any(|f| f == primary_key) {
        fields.insert(0, primary_key.to_string());
    }
    document.project(&fields)
}

fn operator_document(condition: &Value) -> Option<&Document> {
    condition
        .as_document()
        .filter(|d| !d.is_empty() && d.keys().all(|k| k.starts_with('$')))
}

fn apply_operator(operator: &str, actual: &Value, operand: &Value) -> bool {
    match operator {
        "$ne" => actual != operand,
        "$in" => operand.as_array().is_some_and(|values| values.contains(actual)),
        _ if actual.is_null() => false,
        "$gt" => actual > operand,
        "$gte" => actual >= operand,
        "$lt" => actual < operand,
        "$lte" => actual <= operand,
        _ => false,
    }
}
