//! Offset-based pagination and URL helpers for REST APIs reached through a [`Client`].
//!
//! Relay-style cursors (`first`/`after`, `last`/`before`) are translated into the `page` and
//! `page_size` query parameters understood by offset-paginated APIs.

// self
use crate::{_prelude::*, client::Client, error::ConfigError};

/// Page size used when neither `first` nor `last` is set.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Query parameters keyed by name; each name may carry several values.
pub type QueryValues = BTreeMap<String, Vec<String>>;

/// Relay-style pagination arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInput {
	/// Forward page size.
	pub first: Option<u32>,
	/// Forward cursor, an integer offset for REST APIs.
	pub after: Option<String>,
	/// Backward page size.
	pub last: Option<u32>,
	/// Backward cursor, an integer offset for REST APIs.
	pub before: Option<String>,
}

/// Translates `pagination` into one-based `page` and `page_size` query parameters.
///
/// `first` supersedes `last` as the page size, and `after` supersedes `before` as the offset.
/// No input yields no parameters.
pub fn api_pagination_params(pagination: Option<&PaginationInput>) -> Result<QueryValues> {
	let Some(pagination) = pagination else {
		return Ok(QueryValues::new());
	};
	let page_size = [pagination.first, pagination.last]
		.into_iter()
		.flatten()
		.find(|size| *size > 0)
		.unwrap_or(DEFAULT_PAGE_SIZE);
	let mut offset = 0;

	if let Some(before) = non_empty(&pagination.before) {
		offset = parse_offset("before", before)?;
	}
	if let Some(after) = non_empty(&pagination.after) {
		offset = parse_offset("after", after)?;
	}

	let page = offset / u64::from(page_size) + 1;

	Ok(QueryValues::from([
		("page".to_owned(), vec![page.to_string()]),
		("page_size".to_owned(), vec![page_size.to_string()]),
	]))
}

/// Merges query parameter sets; a name present in a later set replaces earlier values.
pub fn merge_url_values<I>(values: I) -> QueryValues
where
	I: IntoIterator<Item = QueryValues>,
{
	values.into_iter().fold(QueryValues::new(), |mut merged, set| {
		merged.extend(set);

		merged
	})
}

/// Encodes query parameters as `application/x-www-form-urlencoded`, sorted by name.
pub fn encode_query(values: &QueryValues) -> String {
	let mut serializer = url::form_urlencoded::Serializer::new(String::new());

	for (name, list) in values {
		for value in list {
			serializer.append_pair(name, value);
		}
	}

	serializer.finish()
}

/// Builds `<api_scheme>://<api_host><path>[?<query>]` for `client`.
pub fn compose_api_url(client: &dyn Client, path: &str, query: &str) -> Result<String> {
	let mut url = Url::parse(&format!("{}://{}", client.api_scheme(), client.api_host()))
		.map_err(ConfigError::from)?;

	url.set_path(path);

	if !query.is_empty() {
		url.set_query(Some(query));
	}

	Ok(url.into())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|v| !v.is_empty())
}

fn parse_offset(cursor: &'static str, value: &str) -> Result<u64> {
	value.parse().map_err(|_| Error::PaginationCursor { cursor, value: value.to_owned() })
}
