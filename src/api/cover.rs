use rocket::response::content::RawHtml;
use rocket::serde::{Deserialize, json::Json};

use crate::cover::CoverSheet;
use crate::cover::sheet::render_html;
use crate::models::FormData;

#[derive(Deserialize)]
pub struct CoverRequest {
    form: FormData,
}

/// The printable cover for the current form.
#[post("/cover/preview", data = "<request>")]
pub async fn api_cover_preview(request: Json<CoverRequest>) -> RawHtml<String> {
    RawHtml(render_html(&CoverSheet::from_form(&request.form)))
}
