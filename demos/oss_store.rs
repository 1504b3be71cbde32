use blobgate::util::replacer::to_public_oss_host;
use blobgate::{GetOptions, ObjectMetadata, PutOptions, StorageClientFactory, StorageOptions};
use std::io::Cursor;
use tokio::io::AsyncReadExt;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let options = StorageOptions::oss("my-bucket-1234")
        .with_credentials("the_access_key_id", "the_access_key_secret")
        .with_endpoint("oss-cn-hangzhou-internal.aliyuncs.com")
        .with_ssl(true);
    let client = StorageClientFactory::builder(options)
        .with_presigned_url_replacer(to_public_oss_host(true))
        .build()
        .unwrap();

    let mut body = Cursor::new(b"0123456789".repeat(200));
    client
        .put(
            "images/cat.png",
            &mut body,
            ObjectMetadata::new(),
            &PutOptions::default().with_content_type("image/png"),
        )
        .await
        .unwrap();

    let options = GetOptions::default().with_crc_validation(true);
    let content = client.get("images/cat.png", &options).await.unwrap();
    println!("read {} bytes with CRC validation", content.len());

    let mut reader = client.range("images/cat.png", 10, 5).await.unwrap();
    let mut slice = Vec::new();
    reader.read_to_end(&mut slice).await.unwrap();
    println!("range: {}", String::from_utf8_lossy(&slice));

    let url = client
        .sign_url_with_process("images/cat.png", 600, "image/resize,w_100")
        .await
        .unwrap();
    println!("{}", url);

    println!("exists: {}", client.exists("images/cat.png").await.unwrap());
    client.del("images/cat.png").await.unwrap();
}
