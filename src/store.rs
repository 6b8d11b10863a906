const SERVICE_NAME: &str = "libcal";

pub fn store_secret(client_id: &str, secret: &str) -> anyhow::Result<()> {
    let entry = keyring::Entry::new(SERVICE_NAME, client_id);
    entry.set_password(secret)?;
    Ok(())
}

pub fn get_secret(client_id: &str) -> anyhow::Result<String> {
    let entry = keyring::Entry::new(SERVICE_NAME, client_id);
    let secret = entry.get_password()?;
    Ok(secret)
}

pub fn delete_secret(client_id: &str) -> anyhow::Result<()> {
    let entry = keyring::Entry::new(SERVICE_NAME, client_id);
    entry.delete_password()?;
    Ok(())
}
