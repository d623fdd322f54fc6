use crate::routes::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "metafarm-server",
    description = "Plant image analysis API",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(api::api_docs());
    root
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn docs_list_every_route() {
        let docs = get_docs();
        let paths: Vec<&str> = docs.paths.paths.keys().map(String::as_str).collect();
        assert!(paths.contains(&"/api/ping"));
        assert!(paths.contains(&"/api/analysis"));
        assert!(paths.contains(&"/api/analysis/{id}"));
    }
}
