use std::convert::Infallible;

use rocket::request::{FromRequest, Outcome};
use rocket::Request;

pub const DEFAULT_PAGE_LENGTH: u32 = 20;
pub const MAX_PAGE_LENGTH: u32 = 100;

/// Page requested through the `page`/`p` and `len`/`l` query values.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PageState {
    pub page_length: u32,
    pub page: u32,
}

impl Default for PageState {
    fn default() -> Self {
        PageState {
            page_length: DEFAULT_PAGE_LENGTH,
            page: 0,
        }
    }
}

impl PageState {
    pub fn skip(&self) -> u64 {
        self.page as u64 * self.page_length as u64
    }

    pub fn limit(&self) -> i64 {
        self.page_length as i64
    }
}

fn query_u32(request: &Request<'_>, name: &str, short: &str) -> Option<u32> {
    request
        .query_value(name)
        .and_then(|it| it.ok())
        .or_else(|| request.query_value(short).and_then(|it| it.ok()))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PageState {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let length = query_u32(request, "len", "l")
            .unwrap_or(DEFAULT_PAGE_LENGTH)
            .clamp(1, MAX_PAGE_LENGTH);
        let page = query_u32(request, "page", "p").unwrap_or(0);

        Outcome::Success(PageState {
            page_length: length,
            page,
        })
    }
}
