use blobgate::storage::ListRequest;
use blobgate::{GetOptions, ObjectMetadata, PutOptions, StorageClientFactory, StorageOptions};
use std::collections::HashMap;
use std::io::Cursor;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // A local MinIO; keys ending in 0-4 go to "my-bucket-01234", 5-9 to "my-bucket-56789"
    let options = StorageOptions::s3("my-bucket")
        .with_credentials("the_access_key_id", "the_secret_access_key")
        .with_endpoint("127.0.0.1:9000")
        .with_force_path_style(true)
        .with_shards(["01234", "56789"]);
    let client = StorageClientFactory::from_options(options).unwrap();

    let meta = HashMap::from([("owner".to_string(), "demo".to_string())]);
    let mut body = Cursor::new(b"hello from blobgate".to_vec());
    client
        .put("reports/2024-1", &mut body, meta, &PutOptions::default())
        .await
        .unwrap();

    let mut body = Cursor::new("compressible ".repeat(512).into_bytes());
    client
        .compress_and_put("reports/2024-2", &mut body, ObjectMetadata::new(), &PutOptions::default())
        .await
        .unwrap();

    let content = client.get("reports/2024-1", &GetOptions::default()).await.unwrap();
    println!("content: {}", String::from_utf8_lossy(&content));

    let head = client
        .head("reports/2024-1", &["owner", "Content-Length"])
        .await
        .unwrap();
    println!("head: {:?}", head);

    let restored = client.get_and_decompress("reports/2024-2").await.unwrap();
    println!("decompressed {} bytes", restored.len());

    let keys = client
        .list_object("any-1", &ListRequest::new("reports/"))
        .await
        .unwrap();
    println!("keys in the 01234 bucket: {:?}", keys);

    println!("{}", client.sign_url("reports/2024-1", 600).await.unwrap());

    client
        .del_multi(&["reports/2024-1", "reports/2024-2"])
        .await
        .unwrap();
}
