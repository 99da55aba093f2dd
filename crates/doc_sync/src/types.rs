use lsp_types::notification::Notification;
use serde::{Deserialize, Serialize};

use crate::{JsonValue, Result};

/// A dynamic notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct AnyNotification {
	/// The method to be invoked.
	pub method: String,
	/// The notification's params.
	#[serde(default = "JsonValue::default")]
	pub params: JsonValue,
}

impl AnyNotification {
	/// Serialize typed params into a notification for `N`.
	pub fn new<N: Notification>(params: N::Params) -> Result<Self> {
		Ok(Self {
			method: N::METHOD.into(),
			params: serde_json::to_value(params)?,
		})
	}

	/// Deserialize the params back into `N`'s typed form.
	///
	/// Returns `None` when the method does not match `N`.
	pub fn parse<N: Notification>(&self) -> Option<Result<N::Params>> {
		if self.method != N::METHOD {
			return None;
		}
		Some(serde_json::from_value(self.params.clone()).map_err(Into::into))
	}
}
