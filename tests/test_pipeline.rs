use mockito::{Matcher, Server, ServerGuard};
use recipe_extract::{
    ExtractConfig, ExtractError, OpenAIProvider, OutputSchema, Progress, RecipeDocument,
    RecipeOrigin, RecipePipeline, RecipeStore, SqliteStore, Unit,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn page_with_json_ld(json_ld: &str) -> String {
    format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>Recipe Page</title>
            <script type="application/ld+json">
                {}
            </script>
        </head>
        <body>
            <h1>Recipe</h1>
        </body>
        </html>
        "#,
        json_ld
    )
}

const PLAIN_PAGE: &str = r#"
    <html>
    <head><title>Grandma Pancakes</title><style>h1 { color: red; }</style></head>
    <body>
        <h1>Grandma Pancakes</h1>
        <ul><li>2 kg flour</li><li>1 l milk</li><li>3 eggs</li></ul>
        <p>Whisk everything, then fry.</p>
        <script>trackVisitor();</script>
    </body>
    </html>
"#;

fn chat_reply(content: serde_json::Value) -> String {
    json!({"choices": [{"message": {"role": "assistant", "content": content.to_string()}}]})
        .to_string()
}

fn pancakes_reply() -> serde_json::Value {
    json!({
        "recipe": {
            "name": "Grandma Pancakes",
            "ingredients": [
                {"name": "Flour", "quantity": 2, "unit": "kg"},
                {"name": "Milk", "quantity": 1000, "unit": "ml"},
                {"name": "3 eggs", "quantity": 3, "unit": null}
            ],
            "steps": [{"text": "Whisk everything."}, {"text": "Fry."}],
            "time": 20
        }
    })
}

async fn serve_page(server: &mut ServerGuard, body: &str) -> mockito::Mock {
    server
        .mock("GET", "/recipe")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(body)
        .create_async()
        .await
}

fn pipeline(llm_url: String, schema: OutputSchema, store: Option<Arc<SqliteStore>>) -> RecipePipeline {
    let provider = OpenAIProvider::with_base_url(
        "fake_api_key".to_string(),
        llm_url,
        "gpt-3.5-turbo-1106".to_string(),
    );
    let mut builder = RecipePipeline::builder()
        .schema(schema)
        .provider(Box::new(provider));
    if let Some(store) = store {
        builder = builder.store(Box::new(store));
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn test_structured_data_skips_model() {
    let mut site = Server::new_async().await;
    let mut llm = Server::new_async().await;

    let page = serve_page(
        &mut site,
        &page_with_json_ld(
            r#"{
                "@context": "https://schema.org",
                "@type": "Recipe",
                "name": "Site Supplied Soup",
                "recipeIngredient": ["1 l stock", "2 carrots"],
                "prepTime": "PT15M"
            }"#,
        ),
    )
    .await;
    let model = llm
        .mock("POST", "/v1/chat/completions")
        .expect(0)
        .create_async()
        .await;

    let extraction = pipeline(llm.url(), OutputSchema::Custom, None)
        .run(&format!("{}/recipe", site.url()))
        .await
        .unwrap();

    assert_eq!(extraction.origin, RecipeOrigin::StructuredData);
    match extraction.document {
        RecipeDocument::SchemaOrg(value) => {
            assert_eq!(value["name"], "Site Supplied Soup");
            assert_eq!(value["recipeIngredient"][0], "1 l stock");
            assert_eq!(value["prepTime"], "PT15M");
        }
        other => panic!("expected schema.org document, got {other:?}"),
    }
    assert_eq!(extraction.stored_id, None);
    page.assert_async().await;
    model.assert_async().await;
}

#[tokio::test]
async fn test_model_extraction_is_normalized_and_stored() {
    let mut site = Server::new_async().await;
    let mut llm = Server::new_async().await;
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    let _page = serve_page(&mut site, PLAIN_PAGE).await;
    let model = llm
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer fake_api_key")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"response_format": {"type": "json_object"}})),
            Matcher::Regex("2 kg flour".to_string()),
            Matcher::Regex("Whisk everything, then fry.".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_reply(pancakes_reply()))
        .expect(1)
        .create_async()
        .await;

    let url = format!("{}/recipe", site.url());
    let extraction = pipeline(llm.url(), OutputSchema::Custom, Some(store.clone()))
        .run(&url)
        .await
        .unwrap();

    assert_eq!(extraction.origin, RecipeOrigin::Model);
    let recipe = match extraction.document {
        RecipeDocument::Custom(recipe) => recipe,
        other => panic!("expected custom recipe, got {other:?}"),
    };
    assert_eq!(recipe.name, "Grandma Pancakes");
    assert_eq!(recipe.prep_time_minutes, 20);
    assert_eq!(recipe.ingredients[0].quantity, Some(2000.0));
    assert_eq!(recipe.ingredients[0].unit, Unit::Grams);
    assert_eq!(recipe.ingredients[1].unit, Unit::Milliliters);
    assert_eq!(recipe.ingredients[2].name, "Eggs");
    assert_eq!(recipe.ingredients[2].unit, Unit::Unknown);
    model.assert_async().await;

    assert!(extraction.stored_id.is_some());
    let stored = store.load(&url).unwrap().unwrap();
    assert_eq!(stored.recipe, recipe);
    assert!(stored.source_text.contains("2 kg flour"));
    assert!(!stored.source_text.contains("trackVisitor"));
}

#[tokio::test]
async fn test_null_recipe_is_not_found() {
    let mut site = Server::new_async().await;
    let mut llm = Server::new_async().await;
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    let _page = serve_page(&mut site, "<html><body><p>Ten facts about otters.</p></body></html>").await;
    let _model = llm
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(chat_reply(json!({"recipe": null})))
        .create_async()
        .await;

    let url = format!("{}/recipe", site.url());
    let result = pipeline(llm.url(), OutputSchema::Custom, Some(store.clone()))
        .run(&url)
        .await;

    assert!(matches!(result, Err(ExtractError::NotFound)));
    assert!(store.load(&url).unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_reply_is_not_persisted() {
    let mut site = Server::new_async().await;
    let mut llm = Server::new_async().await;
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    let _page = serve_page(&mut site, PLAIN_PAGE).await;
    let _model = llm
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(chat_reply(json!({
            "recipe": {"name": "Grandma Pancakes", "steps": [{"text": "Fry."}], "time": 20}
        })))
        .create_async()
        .await;

    let url = format!("{}/recipe", site.url());
    let result = pipeline(llm.url(), OutputSchema::Custom, Some(store.clone()))
        .run(&url)
        .await;

    assert!(matches!(result, Err(ExtractError::MalformedResponse(_))));
    assert!(store.load(&url).unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_url_rejected_before_fetch() {
    let mut site = Server::new_async().await;
    let mut llm = Server::new_async().await;
    let page = site.mock("GET", Matcher::Any).expect(0).create_async().await;
    let model = llm
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let result = pipeline(llm.url(), OutputSchema::Custom, None)
        .run("definitely not a url")
        .await;

    assert!(matches!(result, Err(ExtractError::Validation { .. })));
    page.assert_async().await;
    model.assert_async().await;
}

#[tokio::test]
async fn test_fetch_failure_is_surfaced() {
    let llm = Server::new_async().await;
    let result = pipeline(llm.url(), OutputSchema::Custom, None)
        .run("http://127.0.0.1:9/recipe")
        .await;

    assert!(matches!(result, Err(ExtractError::Fetch(_))));
}

#[tokio::test]
async fn test_schema_org_variant_is_not_stored() {
    let mut site = Server::new_async().await;
    let mut llm = Server::new_async().await;
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    let _page = serve_page(&mut site, PLAIN_PAGE).await;
    let _model = llm
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("schema.org Recipe".to_string()))
        .with_status(200)
        .with_body(chat_reply(json!({
            "recipe": {
                "name": "Grandma Pancakes",
                "recipeIngredient": ["2 kg flour", "1 l milk", "3 eggs"],
                "recipeInstructions": [{"@type": "HowToStep", "text": "Whisk everything, then fry."}]
            }
        })))
        .create_async()
        .await;

    let url = format!("{}/recipe", site.url());
    let extraction = pipeline(llm.url(), OutputSchema::SchemaOrg, Some(store.clone()))
        .run(&url)
        .await
        .unwrap();

    match extraction.document {
        RecipeDocument::SchemaOrg(value) => {
            assert_eq!(value["@type"], "Recipe");
            assert_eq!(value["recipeIngredient"][0], "2 kg flour");
        }
        other => panic!("expected schema.org document, got {other:?}"),
    }
    assert_eq!(extraction.stored_id, None);
    assert!(store.load(&url).unwrap().is_none());
}

#[tokio::test]
async fn test_configured_database_round_trip() {
    let mut site = Server::new_async().await;
    let mut llm = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("recipes.db");

    let _page = serve_page(&mut site, PLAIN_PAGE).await;
    let model = llm
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(chat_reply(pancakes_reply()))
        .expect(1)
        .create_async()
        .await;

    let config = ExtractConfig::from_toml_str(&format!(
        "[provider]\napi_key = \"fake_api_key\"\nbase_url = \"{}\"\n\n[storage]\ndatabase = \"{}\"\n",
        llm.url(),
        db_path.display()
    ))
    .unwrap();
    let pipeline = RecipePipeline::builder().config(config).build().unwrap();

    let url = format!("{}/recipe", site.url());
    let extraction = pipeline.run(&url).await.unwrap();
    assert!(extraction.stored_id.is_some());

    let reopened = SqliteStore::open(&db_path).unwrap();
    let record = reopened.load(&url).unwrap().unwrap();
    let names: Vec<&str> = record
        .recipe
        .ingredients
        .iter()
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(names, vec!["Flour", "Milk", "Eggs"]);
    assert_eq!(record.recipe.prep_time_minutes, 20);

    // A stored URL is refused before the model is asked again
    let again = pipeline.run(&url).await;
    assert!(matches!(again, Err(ExtractError::DuplicateSource(_))));
    model.assert_async().await;
}

#[tokio::test]
async fn test_progress_reports_each_stage() {
    let mut site = Server::new_async().await;
    let mut llm = Server::new_async().await;

    let _page = serve_page(&mut site, PLAIN_PAGE).await;
    let _model = llm
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(chat_reply(pancakes_reply()))
        .create_async()
        .await;

    let stages = Arc::new(Mutex::new(Vec::new()));
    let seen = stages.clone();
    let provider = OpenAIProvider::with_base_url(
        "fake_api_key".to_string(),
        llm.url(),
        "gpt-3.5-turbo-1106".to_string(),
    );
    let pipeline = RecipePipeline::builder()
        .provider(Box::new(provider))
        .on_progress(move |progress| {
            seen.lock().unwrap().push(match progress {
                Progress::Fetching(url) => format!("fetching {}", url.path()),
                Progress::Generating => "generating".to_string(),
            })
        })
        .build()
        .unwrap();

    pipeline
        .run(&format!("{}/recipe", site.url()))
        .await
        .unwrap();

    assert_eq!(
        *stages.lock().unwrap(),
        vec!["fetching /recipe".to_string(), "generating".to_string()]
    );
}
